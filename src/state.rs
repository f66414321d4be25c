//! Serializable snapshot of a [`crate::Core`]'s full internal state.

use serde::{Deserialize, Serialize};

use crate::Ay8910Error;

/// Snapshot format version. Bumped whenever the shape of [`Ay8910State`]
/// changes incompatibly.
pub const STATE_API_VERSION: u32 = 1;

/// Identifies the emulated device a snapshot was captured from.
pub const DEVICE_TYPE: &str = "AY-3-8910";

/// Snapshot of a single tone generator's counter/output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToneState {
    /// Raw 12-bit period as last written to the register pair.
    pub period: u32,
    /// Current down-counter value.
    pub counter: u32,
    /// Current square-wave output bit.
    pub output: bool,
}

/// Snapshot of the shared noise generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseState {
    /// Raw 5-bit period as last written to R6.
    pub period: u32,
    /// Current down-counter value.
    pub counter: u32,
    /// Raw 17-bit LFSR state.
    pub lfsr: u32,
}

/// Snapshot of the shared envelope generator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnvelopeState {
    /// Raw 16-bit period as last written to R11/R12.
    pub period: u32,
    /// Current sub-counter value.
    pub counter: u32,
    /// Shape selector as last written to R13 (4 bits).
    pub shape: u8,
    /// Current segment index (0 or 1).
    pub segment: u8,
    /// Current 5-bit level.
    pub level: u8,
}

/// A complete, versioned snapshot of chip state, suitable for save states or
/// rewind buffers. Contains no file-I/O logic; persisting the serialized
/// form is the caller's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ay8910State {
    /// Snapshot format version; see [`STATE_API_VERSION`].
    pub api_version: u32,
    /// Device identifier; see [`DEVICE_TYPE`].
    pub device_type: String,
    /// Raw contents of all 16 registers.
    pub registers: [u8; crate::registers::NUM_REGISTERS],
    /// The three tone generators.
    pub tones: [ToneState; 3],
    /// The shared noise generator.
    pub noise: NoiseState,
    /// The shared envelope generator.
    pub envelope: EnvelopeState,
    /// Master-cycle prescaler phase (0..16) for the tone/noise tick.
    pub prescaler_phase: u32,
    /// Master-cycle prescaler phase (0..256) for the envelope tick.
    pub envelope_prescaler_phase: u32,
}

impl Ay8910State {
    /// Validates that this snapshot is structurally sound and of a supported
    /// version before it is used to restore a [`crate::Core`].
    ///
    /// # Errors
    /// Returns [`Ay8910Error::StateRestore`] if the version or device type
    /// don't match, or if any field is out of its documented range.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api_version != STATE_API_VERSION {
            return Err(Ay8910Error::StateRestore {
                message: format!(
                    "unsupported state version {} (expected {})",
                    self.api_version, STATE_API_VERSION
                ),
            });
        }
        if self.device_type != DEVICE_TYPE {
            return Err(Ay8910Error::StateRestore {
                message: format!("unexpected device_type {:?}", self.device_type),
            });
        }
        if self.noise.lfsr == 0 || self.noise.lfsr > 0x1_FFFF {
            return Err(Ay8910Error::StateRestore {
                message: "noise.lfsr out of range [1, 0x1FFFF]".into(),
            });
        }
        if self.envelope.level > 31 {
            return Err(Ay8910Error::StateRestore {
                message: "envelope.level out of range [0, 31]".into(),
            });
        }
        if self.envelope.segment > 1 {
            return Err(Ay8910Error::StateRestore {
                message: "envelope.segment must be 0 or 1".into(),
            });
        }
        if self.envelope.shape > 0x0F {
            return Err(Ay8910Error::StateRestore {
                message: "envelope.shape out of range [0, 15]".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> Ay8910State {
        Ay8910State {
            api_version: STATE_API_VERSION,
            device_type: DEVICE_TYPE.to_string(),
            registers: [0; 16],
            tones: [ToneState { period: 1, counter: 1, output: false }; 3],
            noise: NoiseState { period: 1, counter: 0, lfsr: 1 },
            envelope: EnvelopeState { period: 1, counter: 0, shape: 0, segment: 0, level: 31 },
            prescaler_phase: 0,
            envelope_prescaler_phase: 0,
        }
    }

    #[test]
    fn valid_state_passes_validation() {
        assert!(sample_state().validate().is_ok());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut state = sample_state();
        state.api_version = 999;
        assert!(state.validate().is_err());
    }

    #[test]
    fn zero_lfsr_is_rejected() {
        let mut state = sample_state();
        state.noise.lfsr = 0;
        assert!(state.validate().is_err());
    }

    #[test]
    fn out_of_range_envelope_level_is_rejected() {
        let mut state = sample_state();
        state.envelope.level = 32;
        assert!(state.validate().is_err());
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let state = sample_state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: Ay8910State = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.noise.lfsr, state.noise.lfsr);
        assert_eq!(restored.envelope.level, state.envelope.level);
    }
}
