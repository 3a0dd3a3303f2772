//! Byte-channel arithmetic shared by every filter.
//!
//! Pixel channels are straight (non-premultiplied) RGBA bytes. Filters compute
//! in `f64` and store through [`clamp_u8`], which rounds half to even and
//! clamps to `0..=255`, the same rule a clamped byte array applies on store.

/// Channels per pixel.
pub const CHANNELS: usize = 4;

/// Round half to even and clamp to a byte.
#[inline]
pub fn clamp_u8(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Convert a byte channel to `0.0..=1.0`.
#[inline]
pub fn unit(value: u8) -> f64 {
    value as f64 / 255.0
}

/// Byte offset of pixel `(x, y)` in a row-major RGBA buffer.
#[inline]
pub fn offset(x: u32, y: u32, width: u32) -> usize {
    (y as usize * width as usize + x as usize) * CHANNELS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rounds_half_to_even() {
        assert_eq!(clamp_u8(0.5), 0);
        assert_eq!(clamp_u8(1.5), 2);
        assert_eq!(clamp_u8(2.5), 2);
        assert_eq!(clamp_u8(254.6), 255);
    }

    #[test]
    fn test_clamp_saturates() {
        assert_eq!(clamp_u8(-12.0), 0);
        assert_eq!(clamp_u8(300.0), 255);
        assert_eq!(clamp_u8(f64::NAN), 0);
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(0, 0, 10), 0);
        assert_eq!(offset(3, 2, 10), (2 * 10 + 3) * 4);
    }
}
