//! Tone/noise gating and per-channel output mixing.

use crate::constants::amplitude;
use crate::generators::NUM_CHANNELS;

/// Per-channel gating and volume state decoded from R7 (mixer control) and
/// R8-R10 (volume/envelope-mode).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelState {
    /// Tone output disabled for this channel when `true` (mixer bit set).
    pub tone_disabled: bool,
    /// Noise output disabled for this channel when `true` (mixer bit set).
    pub noise_disabled: bool,
    /// Fixed volume level in `[0, 15]`, used when `use_envelope` is `false`.
    pub fixed_volume: u8,
    /// Selects the shared envelope generator's level instead of `fixed_volume`.
    pub use_envelope: bool,
    /// Optional stereo pan position in `[0.0, 1.0]`; `0.5` is centered.
    ///
    /// Supplemental feature: the base chip is mono. This only affects
    /// [`Mixer::channel_outputs`] when called with >1 output channel.
    pub pan: f32,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            pan: 0.5,
            ..Default::default()
        }
    }
}

/// Decodes R7-R10 and combines tone/noise/envelope signals into channel and
/// summed outputs.
#[derive(Debug, Clone)]
pub struct Mixer {
    channels: [ChannelState; NUM_CHANNELS],
    muted: [bool; NUM_CHANNELS],
    use_ay_table: bool,
    volume_scale: f32,
}

impl Mixer {
    /// Creates a mixer with all channels disabled (hardware power-on state)
    /// and the overall output volume scale from spec §4.6/§9 (config
    /// parameter in `[0.0, 1.0]`, applied after the three channels are
    /// summed and before the final clamp).
    pub fn new(use_ay_table: bool, volume_scale: f32) -> Self {
        Self {
            channels: [ChannelState::new(); NUM_CHANNELS],
            muted: [false; NUM_CHANNELS],
            use_ay_table,
            volume_scale,
        }
    }

    /// Decodes R7 (mixer control) into the per-channel tone/noise gates.
    ///
    /// Bit layout: bits 0-2 disable tone for channels A/B/C, bits 3-5 disable
    /// noise for channels A/B/C (a set bit means *disabled*, matching the
    /// hardware's active-low convention).
    pub fn set_mixer_control(&mut self, value: u8) {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            channel.tone_disabled = (value >> i) & 1 != 0;
            channel.noise_disabled = (value >> (i + 3)) & 1 != 0;
        }
    }

    /// Decodes a volume register (R8, R9, or R10) for `channel` (0..=2).
    ///
    /// Bit 4 selects envelope mode; bits 0-3 are the fixed volume level.
    pub fn set_volume(&mut self, channel: usize, value: u8) {
        self.channels[channel].use_envelope = value & 0x10 != 0;
        self.channels[channel].fixed_volume = value & 0x0F;
    }

    /// Mutes or unmutes a channel entirely (host-side convenience, not a
    /// hardware register — grounded in the teacher's `set_mute`).
    pub fn set_mute(&mut self, channel: usize, muted: bool) {
        self.muted[channel] = muted;
    }

    /// Sets a channel's stereo pan position in `[0.0, 1.0]`.
    pub fn set_pan(&mut self, channel: usize, pan: f32) {
        self.channels[channel].pan = pan.clamp(0.0, 1.0);
    }

    /// Computes channel `i`'s contribution to the output given the current
    /// tone/noise bits and the shared envelope level.
    ///
    /// Gating per spec §4.6: both tone and noise disabled silences the
    /// channel; disabling just one passes the other through unchanged;
    /// disabling neither ORs the two raw bits together.
    fn channel_output(
        &self,
        channel: usize,
        tone: bool,
        noise: bool,
        envelope_level: u8,
    ) -> crate::Result<f32> {
        let state = &self.channels[channel];
        if self.muted[channel] {
            return Ok(0.0);
        }

        let gate = match (state.tone_disabled, state.noise_disabled) {
            (true, true) => false,
            (true, false) => noise,
            (false, true) => tone,
            (false, false) => tone || noise,
        };

        if !gate {
            return Ok(0.0);
        }

        let level = if state.use_envelope {
            envelope_level
        } else {
            // Fixed volume is a 4-bit value; the shared DAC curve is indexed
            // by a 5-bit level, so scale by 2 (matches hardware: a fixed
            // volume of `k` sounds identical to envelope level `2k`).
            state.fixed_volume * 2
        };

        amplitude(level, self.use_ay_table)
    }

    /// Computes all three channels' individual outputs.
    pub fn channel_outputs(
        &self,
        tone: [bool; NUM_CHANNELS],
        noise: bool,
        envelope_level: u8,
    ) -> crate::Result<[f32; NUM_CHANNELS]> {
        let mut out = [0.0; NUM_CHANNELS];
        for i in 0..NUM_CHANNELS {
            out[i] = self.channel_output(i, tone[i], noise, envelope_level)?;
        }
        Ok(out)
    }

    /// Sums and clamps the three channel outputs into a single mono sample
    /// in `[-1.0, 1.0]`.
    ///
    /// Per spec §4.6, the three channel amplitudes are summed directly (not
    /// averaged) before the overall volume scale and final clamp.
    pub fn mixed_output(
        &self,
        tone: [bool; NUM_CHANNELS],
        noise: bool,
        envelope_level: u8,
    ) -> crate::Result<f32> {
        let channels = self.channel_outputs(tone, noise, envelope_level)?;
        let sum: f32 = channels.iter().sum();
        Ok((sum * self.volume_scale).clamp(-1.0, 1.0))
    }

    /// Computes an equal-power stereo pair from the per-channel outputs.
    pub fn stereo_output(
        &self,
        tone: [bool; NUM_CHANNELS],
        noise: bool,
        envelope_level: u8,
    ) -> crate::Result<(f32, f32)> {
        let channels = self.channel_outputs(tone, noise, envelope_level)?;
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        for (i, &sample) in channels.iter().enumerate() {
            let pan = self.channels[i].pan;
            left += sample * (1.0 - pan).sqrt();
            right += sample * pan.sqrt();
        }
        Ok((
            (left * self.volume_scale).clamp(-1.0, 1.0),
            (right * self.volume_scale).clamp(-1.0, 1.0),
        ))
    }

    /// Resets all mixer state to the power-on default (all channels
    /// disabled, zero volume, centered pan, unmuted).
    pub fn reset(&mut self) {
        self.channels = [ChannelState::new(); NUM_CHANNELS];
        self.muted = [false; NUM_CHANNELS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_mixer_is_silent() {
        let mixer = Mixer::new(false, 1.0);
        let out = mixer
            .mixed_output([true, true, true], true, 31)
            .unwrap();
        assert_eq!(out, 0.0);
    }

    #[test]
    fn enabling_tone_with_max_volume_produces_full_scale() {
        let mut mixer = Mixer::new(false, 1.0);
        mixer.set_mixer_control(0b0011_1110); // tone A enabled, rest disabled
        mixer.set_volume(0, 0x0F); // fixed max volume
        let out = mixer.mixed_output([true, true, true], true, 0).unwrap();
        assert!(out > 0.0);
    }

    #[test]
    fn muted_channel_contributes_nothing() {
        let mut mixer = Mixer::new(false, 1.0);
        mixer.set_mixer_control(0b0011_1110);
        mixer.set_volume(0, 0x0F);
        mixer.set_mute(0, true);
        let out = mixer.mixed_output([true, true, true], true, 0).unwrap();
        assert_eq!(out, 0.0);
    }

    #[test]
    fn envelope_mode_tracks_shared_envelope_level() {
        let mut mixer = Mixer::new(false, 1.0);
        mixer.set_mixer_control(0b0011_1110);
        mixer.set_volume(0, 0x10); // envelope mode, volume bits ignored
        let low = mixer.mixed_output([true, true, true], true, 0).unwrap();
        let high = mixer.mixed_output([true, true, true], true, 31).unwrap();
        assert!(high > low);
    }

    #[test]
    fn reset_restores_silence() {
        let mut mixer = Mixer::new(false, 1.0);
        mixer.set_mixer_control(0b0011_1110);
        mixer.set_volume(0, 0x0F);
        mixer.reset();
        let out = mixer.mixed_output([true, true, true], true, 31).unwrap();
        assert_eq!(out, 0.0);
    }

    #[test]
    fn both_tone_and_noise_disabled_is_silent_even_with_volume() {
        let mut mixer = Mixer::new(false, 1.0);
        // Channel A: both tone and noise disabled (bit 0 and bit 3 set).
        mixer.set_mixer_control(0b0000_1001);
        mixer.set_volume(0, 0x0F);
        let out = mixer.channel_output(0, true, true, 0).unwrap();
        assert_eq!(out, 0.0, "both gates disabled must silence the channel");
    }

    #[test]
    fn neither_disabled_ors_tone_and_noise() {
        let mut mixer = Mixer::new(false, 1.0);
        mixer.set_mixer_control(0); // nothing disabled
        mixer.set_volume(0, 0x0F);
        assert!(mixer.channel_output(0, true, false, 0).unwrap() > 0.0);
        assert!(mixer.channel_output(0, false, true, 0).unwrap() > 0.0);
        assert_eq!(mixer.channel_output(0, false, false, 0).unwrap(), 0.0);
    }

    #[test]
    fn stereo_pan_sends_signal_to_selected_side() {
        let mut mixer = Mixer::new(false, 1.0);
        mixer.set_mixer_control(0b0011_1110);
        mixer.set_volume(0, 0x0F);
        mixer.set_pan(0, 1.0);
        let (left, right) = mixer.stereo_output([true, true, true], true, 0).unwrap();
        assert_eq!(left, 0.0);
        assert!(right > 0.0);
    }
}
