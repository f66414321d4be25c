//! Emulator configuration.

use crate::Ay8910Error;

/// Which physical chip's DAC curve and volume-register semantics to emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipType {
    /// Original General Instrument AY-3-8910: 16-entry fixed-volume DAC table.
    Ay38910,
    /// Yamaha YM2149 ("YMZ294" successor): 32-entry fixed-volume DAC table,
    /// twice the resolution of the AY-3-8910.
    Ym2149,
}

impl ChipType {
    pub(crate) fn uses_ay_table(self) -> bool {
        matches!(self, ChipType::Ay38910)
    }
}

impl Default for ChipType {
    fn default() -> Self {
        ChipType::Ym2149
    }
}

/// Emulator configuration, built via [`ConfigBuilder`] or [`Config::default`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Which chip variant's DAC curve to use.
    pub chip_type: ChipType,
    /// Master clock frequency in Hz (undivided — the prescalers are applied
    /// internally by the tick loop, not by dividing this value). Hard bound
    /// 10 MHz per spec §6.
    pub clock_hz: u32,
    /// Output sample rate in Hz. Hard bound 192 kHz per spec §6.
    pub sample_rate: u32,
    /// Output channel count: 1 (mono) or 2 (stereo).
    pub channels: u8,
    /// Ring buffer capacity in frames, derived from `buffer_seconds *
    /// sample_rate` by [`ConfigBuilder::build`] whenever `buffer_seconds`
    /// was set; otherwise left at its default.
    pub buffer_capacity: usize,
    /// Target ring buffer depth in seconds of audio, per spec §6
    /// (`buffer_seconds ≤ 4096 / sample_rate` worth of frames at the default
    /// capacity — i.e. roughly a tenth of a second at 44.1 kHz).
    pub buffer_seconds: f32,
    /// Overall output volume scale applied by the mixer, in `[0.0, 1.0]`.
    pub volume_scale: f32,
    /// Enables the 8x-oversampled HQ pipeline (cubic interpolation + FIR
    /// decimation + DC blocking) instead of direct fractional-accumulator
    /// sampling.
    pub high_quality: bool,
    /// Enables `log`-crate tracing of register writes and envelope
    /// retriggers. Requires the `debug-log` feature.
    pub enable_debug: bool,
}

/// Default master clock: the common 2 MHz AY-3-8910/YM2149 oscillator.
pub const DEFAULT_CLOCK_HZ: u32 = 2_000_000;

/// Hard upper bound on `clock_hz`, per spec §6.
pub const MAX_CLOCK_HZ: u32 = 10_000_000;

/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Hard upper bound on `sample_rate`, per spec §6.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Default ring buffer capacity, in frames.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

impl Default for Config {
    fn default() -> Self {
        Self {
            chip_type: ChipType::default(),
            clock_hz: DEFAULT_CLOCK_HZ,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            buffer_seconds: DEFAULT_BUFFER_CAPACITY as f32 / DEFAULT_SAMPLE_RATE as f32,
            volume_scale: 1.0,
            high_quality: false,
            enable_debug: false,
        }
    }
}

/// Validating builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
    buffer_seconds_override: Option<f32>,
}

impl ConfigBuilder {
    /// Starts from [`Config::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chip variant.
    pub fn chip_type(mut self, chip_type: ChipType) -> Self {
        self.config.chip_type = chip_type;
        self
    }

    /// Sets the master clock frequency in Hz.
    pub fn clock_hz(mut self, clock_hz: u32) -> Self {
        self.config.clock_hz = clock_hz;
        self
    }

    /// Sets the output sample rate in Hz.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Sets the output channel count (1 for mono, 2 for stereo).
    pub fn channels(mut self, channels: u8) -> Self {
        self.config.channels = channels;
        self
    }

    /// Sets the ring buffer capacity directly, in frames.
    ///
    /// Mutually exclusive in effect with [`Self::buffer_seconds`]: whichever
    /// is called last before [`Self::build`] is irrelevant — `build()`
    /// recomputes `buffer_capacity` from `buffer_seconds` only if
    /// [`Self::buffer_seconds`] was ever called.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Sets the target ring buffer depth in seconds; `build()` converts this
    /// to a frame count using the configured `sample_rate`.
    pub fn buffer_seconds(mut self, seconds: f32) -> Self {
        self.config.buffer_seconds = seconds;
        self.buffer_seconds_override = Some(seconds);
        self
    }

    /// Sets the overall output volume scale applied by the mixer, in
    /// `[0.0, 1.0]`.
    pub fn volume_scale(mut self, scale: f32) -> Self {
        self.config.volume_scale = scale;
        self
    }

    /// Enables or disables the HQ oversampling pipeline.
    pub fn high_quality(mut self, enabled: bool) -> Self {
        self.config.high_quality = enabled;
        self
    }

    /// Enables or disables debug tracing.
    pub fn enable_debug(mut self, enabled: bool) -> Self {
        self.config.enable_debug = enabled;
        self
    }

    /// Validates and produces the final [`Config`].
    ///
    /// # Errors
    /// Returns [`Ay8910Error::InvalidValue`] if `clock_hz`, `sample_rate`, or
    /// `buffer_capacity` is zero; if either exceeds its hard bound
    /// ([`MAX_CLOCK_HZ`] / [`MAX_SAMPLE_RATE`]); if `sample_rate` exceeds
    /// `clock_hz` (sample-rate conversion requires downsampling, never
    /// upsampling); if `channels` isn't 1 or 2; or if `volume_scale` is
    /// outside `[0.0, 1.0]`.
    pub fn build(mut self) -> crate::Result<Config> {
        if let Some(seconds) = self.buffer_seconds_override {
            self.config.buffer_capacity =
                (seconds * self.config.sample_rate as f32).round() as usize;
        }
        let config = self.config;
        if config.clock_hz == 0 {
            return Err(Ay8910Error::InvalidValue {
                message: "clock_hz must be nonzero".into(),
            });
        }
        if config.clock_hz > MAX_CLOCK_HZ {
            return Err(Ay8910Error::InvalidValue {
                message: format!("clock_hz {} exceeds hard bound {MAX_CLOCK_HZ}", config.clock_hz),
            });
        }
        if config.sample_rate == 0 {
            return Err(Ay8910Error::InvalidValue {
                message: "sample_rate must be nonzero".into(),
            });
        }
        if config.sample_rate > MAX_SAMPLE_RATE {
            return Err(Ay8910Error::InvalidValue {
                message: format!(
                    "sample_rate {} exceeds hard bound {MAX_SAMPLE_RATE}",
                    config.sample_rate
                ),
            });
        }
        if config.buffer_capacity == 0 {
            return Err(Ay8910Error::InvalidValue {
                message: "buffer_capacity must be nonzero".into(),
            });
        }
        if config.sample_rate > config.clock_hz {
            return Err(Ay8910Error::InvalidValue {
                message: format!(
                    "sample_rate {} exceeds clock_hz {}",
                    config.sample_rate, config.clock_hz
                ),
            });
        }
        if config.channels != 1 && config.channels != 2 {
            return Err(Ay8910Error::InvalidValue {
                message: format!("channels {} must be 1 or 2", config.channels),
            });
        }
        if !(0.0..=1.0).contains(&config.volume_scale) {
            return Err(Ay8910Error::InvalidValue {
                message: format!("volume_scale {} out of range [0.0, 1.0]", config.volume_scale),
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().chip_type, ChipType::Ym2149);
    }

    #[test]
    fn builder_rejects_zero_clock() {
        assert!(ConfigBuilder::new().clock_hz(0).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_sample_rate() {
        assert!(ConfigBuilder::new().sample_rate(0).build().is_err());
    }

    #[test]
    fn builder_rejects_zero_buffer_capacity() {
        assert!(ConfigBuilder::new().buffer_capacity(0).build().is_err());
    }

    #[test]
    fn builder_rejects_sample_rate_above_clock() {
        assert!(ConfigBuilder::new()
            .clock_hz(1000)
            .sample_rate(2000)
            .build()
            .is_err());
    }

    #[test]
    fn builder_accepts_valid_configuration() {
        let config = ConfigBuilder::new()
            .chip_type(ChipType::Ay38910)
            .clock_hz(1_789_772)
            .sample_rate(48_000)
            .buffer_capacity(4096)
            .high_quality(true)
            .build()
            .unwrap();
        assert_eq!(config.chip_type, ChipType::Ay38910);
        assert_eq!(config.clock_hz, 1_789_772);
        assert!(config.high_quality);
    }

    #[test]
    fn builder_rejects_clock_above_hard_bound() {
        assert!(ConfigBuilder::new().clock_hz(MAX_CLOCK_HZ + 1).build().is_err());
    }

    #[test]
    fn builder_rejects_sample_rate_above_hard_bound() {
        assert!(ConfigBuilder::new()
            .clock_hz(MAX_CLOCK_HZ)
            .sample_rate(MAX_SAMPLE_RATE + 1)
            .build()
            .is_err());
    }

    #[test]
    fn builder_rejects_invalid_channel_count() {
        assert!(ConfigBuilder::new().channels(3).build().is_err());
        assert!(ConfigBuilder::new().channels(0).build().is_err());
    }

    #[test]
    fn builder_rejects_volume_scale_out_of_range() {
        assert!(ConfigBuilder::new().volume_scale(1.5).build().is_err());
        assert!(ConfigBuilder::new().volume_scale(-0.1).build().is_err());
    }

    #[test]
    fn buffer_seconds_is_converted_to_frame_capacity() {
        let config = ConfigBuilder::new()
            .sample_rate(44_100)
            .buffer_seconds(0.1)
            .build()
            .unwrap();
        assert_eq!(config.buffer_capacity, 4410);
    }
}
