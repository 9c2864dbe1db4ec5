//! Float to 16-bit PCM conversion used on the channel fill path.

/// Bytes per converted sample.
pub const SAMPLE_BYTES: usize = 2;

const HALF_RANGE: f32 = 32768.0;

/// Converts a normalized float sample to signed 16-bit.
///
/// `1.0` and above saturate to `i16::MAX`, anything below `-1.0` to
/// `i16::MIN`. Everything else is scaled by 32768 and truncated toward zero,
/// so `-1.0` maps exactly to `i16::MIN`. NaN maps to 0.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    if sample >= 1.0 {
        i16::MAX
    } else if sample < -1.0 {
        i16::MIN
    } else {
        (sample * HALF_RANGE) as i16
    }
}

/// Converts `samples` and appends them to `out` as little-endian bytes.
pub fn extend_i16_le(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * SAMPLE_BYTES);
    for &sample in samples {
        out.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(-0.0), 0);
    }

    #[test]
    fn saturates_out_of_range() {
        assert_eq!(f32_to_i16(1.5), i16::MAX);
        assert_eq!(f32_to_i16(f32::INFINITY), i16::MAX);
        assert_eq!(f32_to_i16(-1.0001), i16::MIN);
        assert_eq!(f32_to_i16(f32::NEG_INFINITY), i16::MIN);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn truncates_toward_zero() {
        // Reference values computed as trunc(f * 32768).
        let table: [(f32, i16); 8] = [
            (0.5, 16384),
            (-0.5, -16384),
            (0.25, 8192),
            (0.999_969_5, 32767),
            (0.000_01, 0),
            (-0.000_01, 0),
            (0.1, 3276),
            (-0.1, -3276),
        ];
        for (input, expected) in table {
            assert_eq!(f32_to_i16(input), expected, "input {input}");
        }
    }

    #[test]
    fn writes_little_endian() {
        let mut out = vec![0xAA];
        extend_i16_le(&[0.5, -1.0, 1.0], &mut out);
        assert_eq!(out, vec![0xAA, 0x00, 0x40, 0x00, 0x80, 0xFF, 0x7F]);
    }
}
