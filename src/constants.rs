//! Hardware lookup tables shared across PSG components.
//!
//! Both tables below are taken value-for-value from the chip's documented
//! logarithmic DAC curve; per the spec's wire-exactness constraint, they must
//! never be "smoothed" or recomputed from a formula.

use crate::Ay8910Error;

/// YM2149 DAC table (32 steps, 5-bit resolution), raw 16-bit PCM values.
///
/// This is the envelope/volume curve used whenever `Config::chip_type` is
/// `ChipType::Ym2149`. It is also the table envelope levels are always
/// looked up against, since the envelope generator produces a 5-bit level
/// regardless of chip type.
pub const YM2149_DAC_TABLE: [u16; 32] = [
    0, 418, 608, 882, 1281, 1859, 2700, 3920, 5691, 8262, 11996, 17415, 22500, 27500, 30000,
    32768, 35000, 37500, 40000, 42500, 45000, 47500, 50000, 52500, 55000, 57500, 60000, 62500,
    64000, 65000, 65500, 65535,
];

/// AY-3-8910 DAC table (16 steps, 4-bit resolution), raw 16-bit PCM values.
///
/// Used for fixed-volume channels (register bit 4 clear) when
/// `Config::chip_type` is `ChipType::Ay38910`. A fixed volume register value
/// `k` selects level `2k` on the shared 32-entry envelope scale; for the
/// AY-3-8910 that 5-bit index is halved back down (`level >> 1`) before
/// indexing this 16-entry table.
pub const AY38910_DAC_TABLE: [u16; 16] = [
    0, 837, 1215, 1764, 2561, 3718, 5400, 7839, 11381, 16523, 23991, 34830, 45000, 55000, 60000,
    65535,
];

/// Scale factor mapping the 16-bit PCM tables to normalized `[0.0, 1.0]` floats.
pub const VOLUME_SCALE: f32 = 1.0 / 65535.0;

/// Looks up a normalized amplitude in `[0.0, 1.0]` for a 5-bit envelope/volume level.
///
/// # Arguments
/// * `level` - Envelope or volume index in `[0, 31]`.
/// * `use_ay_table` - Select the 16-entry AY-3-8910 curve instead of the
///   32-entry YM2149 curve; `level` is halved (`level >> 1`) before lookup.
///
/// # Errors
/// Returns [`Ay8910Error::InvalidValue`] if `level` is outside `[0, 31]`.
/// The caller is expected to clamp or mask upstream; this function never
/// silently clamps so that a caller bug surfaces immediately.
pub fn amplitude(level: u8, use_ay_table: bool) -> crate::Result<f32> {
    if level > 31 {
        return Err(Ay8910Error::InvalidValue {
            message: format!("envelope/volume level {level} out of range [0, 31]"),
        });
    }
    let pcm = if use_ay_table {
        AY38910_DAC_TABLE[(level >> 1) as usize]
    } else {
        YM2149_DAC_TABLE[level as usize]
    };
    Ok(pcm as f32 * VOLUME_SCALE)
}

/// Looks up the raw 16-bit PCM equivalent for a 5-bit envelope/volume level.
///
/// # Errors
/// Returns [`Ay8910Error::InvalidValue`] if `level` is outside `[0, 31]`.
pub fn get_volume(level: u8, use_ay_table: bool) -> crate::Result<u16> {
    if level > 31 {
        return Err(Ay8910Error::InvalidValue {
            message: format!("envelope/volume level {level} out of range [0, 31]"),
        });
    }
    Ok(if use_ay_table {
        AY38910_DAC_TABLE[(level >> 1) as usize]
    } else {
        YM2149_DAC_TABLE[level as usize]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ym_table_is_monotonic() {
        for i in 1..YM2149_DAC_TABLE.len() {
            assert!(YM2149_DAC_TABLE[i] >= YM2149_DAC_TABLE[i - 1]);
        }
    }

    #[test]
    fn ay_table_is_monotonic() {
        for i in 1..AY38910_DAC_TABLE.len() {
            assert!(AY38910_DAC_TABLE[i] >= AY38910_DAC_TABLE[i - 1]);
        }
    }

    #[test]
    fn ym_table_size_is_32() {
        assert_eq!(YM2149_DAC_TABLE.len(), 32);
    }

    #[test]
    fn ay_table_size_is_16() {
        assert_eq!(AY38910_DAC_TABLE.len(), 16);
    }

    #[test]
    fn amplitude_is_normalized() {
        for level in 0u8..=31 {
            let a = amplitude(level, false).unwrap();
            assert!((0.0..=1.0).contains(&a));
        }
        for level in 0u8..=31 {
            let a = amplitude(level, true).unwrap();
            assert!((0.0..=1.0).contains(&a));
        }
    }

    #[test]
    fn amplitude_zero_is_silence() {
        assert_eq!(amplitude(0, false).unwrap(), 0.0);
        assert_eq!(amplitude(0, true).unwrap(), 0.0);
    }

    #[test]
    fn amplitude_max_is_one() {
        assert!((amplitude(31, false).unwrap() - 1.0).abs() < 1e-6);
        assert!((amplitude(31, true).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn amplitude_out_of_range_is_an_error() {
        assert!(amplitude(32, false).is_err());
        assert!(get_volume(255, false).is_err());
    }
}
