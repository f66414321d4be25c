//! AY-3-8910 / YM2149 PSG Emulator
//!
//! A cycle-accurate emulator of the General Instrument AY-3-8910 Programmable
//! Sound Generator and its Yamaha YM2149 derivative: three tone channels, a
//! shared noise generator, a shared envelope generator, and a logarithmic
//! DAC, driven tick-by-tick from a master clock.
//!
//! # Features
//! - Cycle-accurate generators (12-bit tone counters, 5-bit noise counter
//!   with the documented ×2 period, 16-shape envelope state machine)
//! - Register-level fidelity: writes take effect exactly as the hardware
//!   documents, including the R13 envelope retrigger-on-every-write quirk
//! - Fractional-accumulator sample rate conversion with zero long-term drift
//! - A blocking SPSC ring buffer and background audio driver for real-time
//!   output
//! - An optional 8x-oversampled HQ pipeline (cubic interpolation, 192-tap
//!   FIR, DC blocking)
//!
//! # Quick start
//! ```no_run
//! use ay8910::{Config, Core};
//!
//! let mut core = Core::new(Config::default());
//! core.write(0, 0x7D).unwrap(); // Tone A period, low byte
//! core.write(1, 0x00).unwrap(); // Tone A period, high byte
//! core.write(7, 0x3E).unwrap(); // Mixer: tone A enabled, rest disabled
//! core.write(8, 0x0F).unwrap(); // Channel A: fixed max volume
//!
//! core.tick(1000);
//! let sample = core.mixed_output();
//! ```

#![warn(missing_docs)]

mod chip;
pub mod config;
pub mod constants;
mod generators;
pub mod hq_pipeline;
mod lfsr;
mod mixer;
pub mod registers;
mod sample_generator;
pub mod state;
pub mod streaming;

pub use chip::Core;
pub use config::{ChipType, Config, ConfigBuilder};
pub use constants::get_volume;
pub use registers::Register;
pub use sample_generator::SampleGenerator;
pub use state::Ay8910State;

/// Error kinds raised by this crate.
///
/// This enum only covers chip emulation, configuration, and streaming
/// errors. There is no file-I/O variant: state snapshots are in-memory
/// (`Ay8910State`) and persistence, if any, is the caller's responsibility.
#[derive(thiserror::Error, Debug)]
pub enum Ay8910Error {
    /// A register address outside `[0, 15]` was used.
    #[error("register address {address} out of range [0, 15]")]
    RegisterAccess {
        /// The offending address.
        address: u8,
    },

    /// A value or configuration parameter was outside its valid range.
    #[error("invalid value: {message}")]
    InvalidValue {
        /// Human-readable description of what was invalid.
        message: String,
    },

    /// A state snapshot was missing required fields or failed validation.
    #[error("state restore failed: {message}")]
    StateRestore {
        /// Human-readable description of the validation failure.
        message: String,
    },

    /// The host audio sink failed to open or start.
    #[error("audio backend error: {0}")]
    AudioBackend(String),

    /// An error occurred inside the producer thread or consumer callback.
    #[error("audio runtime error: {0}")]
    AudioRuntime(String),
}

/// Result type for emulator operations.
pub type Result<T> = std::result::Result<T, Ay8910Error>;
