//! Tone, noise, and envelope generators.
//!
//! Each generator is a small state machine advanced one *prescaled* tick at
//! a time. The 16:1 (tone/noise) and 256:1 (envelope) prescaler division
//! lives in [`crate::chip::Core`], not here — these generators have no
//! notion of the master clock.

use crate::lfsr::Lfsr;

/// Number of tone channels.
pub const NUM_CHANNELS: usize = 3;

/// 12-bit down-counter tone generator.
///
/// Toggles its 1-bit output every time the counter underflows, producing a
/// square wave of period `2 * effective_period` prescaled ticks.
#[derive(Clone, Debug)]
pub struct ToneGenerator {
    counter: u32,
    period: u32,
    output: bool,
}

impl ToneGenerator {
    /// Creates a tone generator at the documented power-on state: counter
    /// equal to the period, output low.
    pub fn new() -> Self {
        Self {
            counter: 1,
            period: 1,
            output: false,
        }
    }

    /// Sets the 12-bit period (`0..=4095`); a period of zero is clamped to 1.
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = period.max(1);
    }

    /// Returns the effective (clamped) period.
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Advances the counter by one prescaled tick.
    #[inline]
    pub fn tick(&mut self) {
        self.counter -= 1;
        if self.counter == 0 {
            self.output = !self.output;
            self.counter = self.period;
        }
    }

    /// Returns the current 1-bit output.
    #[inline]
    pub fn output(&self) -> bool {
        self.output
    }

    /// Returns the current down-counter value, for snapshotting.
    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Resets to the power-on state using the current period.
    pub fn reset(&mut self) {
        self.counter = self.period;
        self.output = false;
    }

    /// Restores counter and output directly from a snapshot, bypassing
    /// [`Self::reset`]'s power-on behavior.
    pub fn restore(&mut self, counter: u32, output: bool) {
        self.counter = counter;
        self.output = output;
    }
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// 5-bit down-counter noise generator gating a shared 17-bit LFSR.
///
/// The documented "×2" behavior is intrinsic to the hardware: the LFSR
/// advances once every `2 * effective_period` prescaled ticks, not every
/// `effective_period` ticks.
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    counter: u32,
    period: u32,
    lfsr: Lfsr,
}

impl NoiseGenerator {
    /// Creates a noise generator at the documented power-on state.
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            lfsr: Lfsr::new(),
        }
    }

    /// Sets the 5-bit period (`0..=31`); a period of zero is clamped to 1.
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = period.max(1);
    }

    /// Advances by one prescaled tick, stepping the LFSR every `2 * period` ticks.
    #[inline]
    pub fn tick(&mut self) {
        self.counter += 1;
        if self.counter >= self.period * 2 {
            self.lfsr.step();
            self.counter = 0;
        }
    }

    /// Returns the LFSR's current output bit.
    #[inline]
    pub fn output(&self) -> bool {
        self.lfsr.output() != 0
    }

    /// Returns the raw LFSR state (for snapshotting).
    pub fn lfsr_state(&self) -> u32 {
        self.lfsr.state()
    }

    /// Returns the current down-counter value, for snapshotting.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Restores the down-counter and LFSR state directly from a snapshot.
    ///
    /// # Errors
    /// Returns an error if `lfsr_state` is zero or exceeds the 17-bit range.
    pub fn restore(&mut self, counter: u32, lfsr_state: u32) -> crate::Result<()> {
        self.counter = counter;
        self.lfsr.set_state(lfsr_state)
    }

    /// Restores the raw LFSR state (for snapshot restore).
    pub fn set_lfsr_state(&mut self, state: u32) -> crate::Result<()> {
        self.lfsr.set_state(state)
    }

    /// Resets to the power-on state: counter zeroed, LFSR reseeded to 1.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.lfsr.reset(1).expect("seed 1 is always valid");
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A segment function used by one half of an envelope shape's trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    SlideDown,
    SlideUp,
    HoldBottom,
    HoldTop,
}

/// Maps the 4-bit shape register to a pair of segment functions, per spec §4.5.
const SHAPE_SEGMENTS: [(Segment, Segment); 16] = {
    use Segment::*;
    [
        (SlideDown, HoldBottom), // 0
        (SlideDown, HoldBottom), // 1
        (SlideDown, HoldBottom), // 2
        (SlideDown, HoldBottom), // 3
        (SlideUp, HoldBottom),   // 4
        (SlideUp, HoldBottom),   // 5
        (SlideUp, HoldBottom),   // 6
        (SlideUp, HoldBottom),   // 7
        (SlideDown, SlideDown),  // 8
        (SlideDown, HoldBottom), // 9
        (SlideDown, SlideUp),    // 10
        (SlideDown, HoldTop),    // 11
        (SlideUp, SlideUp),      // 12
        (SlideUp, HoldTop),      // 13
        (SlideUp, SlideDown),    // 14
        (SlideUp, HoldBottom),   // 15
    ]
};

/// 16-bit period counter feeding a 5-bit level counter through a 16-shape
/// segment state machine.
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    counter: u32,
    period: u32,
    shape: u8,
    segment: usize,
    level: i32,
}

impl EnvelopeGenerator {
    /// Creates an envelope generator at the documented power-on state:
    /// level 31, shape 0, segment 0.
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            shape: 0,
            segment: 0,
            level: 31,
        }
    }

    /// Sets the 16-bit period; a period of zero is clamped to 1.
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = period.max(1);
    }

    /// Sets the shape and retriggers the envelope.
    ///
    /// This *always* resets the sub-counter, segment index, and level to 31
    /// — even if `shape` is identical to the current shape — because music
    /// software relies on every R13 write as a retrigger.
    #[inline]
    pub fn set_shape(&mut self, shape: u8) {
        self.shape = shape & 0x0F;
        self.trigger();
    }

    /// Resets the sub-counter, segment index, and level without changing shape.
    #[inline]
    pub fn trigger(&mut self) {
        self.counter = 0;
        self.segment = 0;
        self.level = 31;
    }

    /// Restores shape, segment, sub-counter, and level directly from a
    /// snapshot, bypassing [`Self::set_shape`]'s retrigger-on-write behavior.
    pub fn restore(&mut self, shape: u8, segment: usize, counter: u32, level: u8) {
        self.shape = shape & 0x0F;
        self.segment = segment & 1;
        self.counter = counter;
        self.level = level as i32;
    }

    /// Advances by one prescaled tick.
    #[inline]
    pub fn tick(&mut self) {
        self.counter += 1;
        if self.counter >= self.period {
            self.counter = 0;
            self.apply_segment();
        }
    }

    fn apply_segment(&mut self) {
        let (seg0, seg1) = SHAPE_SEGMENTS[self.shape as usize];
        let current = if self.segment == 0 { seg0 } else { seg1 };
        match current {
            Segment::SlideDown => {
                self.level -= 1;
                if self.level < 0 {
                    self.segment ^= 1;
                    let (_, next_after_toggle) = SHAPE_SEGMENTS[self.shape as usize];
                    let entered = if self.segment == 0 { seg0 } else { next_after_toggle };
                    self.level = match entered {
                        Segment::SlideDown | Segment::HoldTop => 31,
                        _ => 0,
                    };
                }
            }
            Segment::SlideUp => {
                self.level += 1;
                if self.level > 31 {
                    self.segment ^= 1;
                    let (_, next_after_toggle) = SHAPE_SEGMENTS[self.shape as usize];
                    let entered = if self.segment == 0 { seg0 } else { next_after_toggle };
                    self.level = match entered {
                        Segment::SlideDown | Segment::HoldTop => 31,
                        _ => 0,
                    };
                }
            }
            Segment::HoldBottom => self.level = 0,
            Segment::HoldTop => self.level = 31,
        }
    }

    /// Returns the current level in `[0, 31]`.
    #[inline]
    pub fn level(&self) -> u8 {
        self.level as u8
    }

    /// Returns the current segment index (0 or 1), for snapshotting.
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Returns the current sub-counter, for snapshotting.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Resets to the power-on state: shape 0, level 31, segment 0.
    pub fn reset(&mut self) {
        self.shape = 0;
        self.trigger();
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
