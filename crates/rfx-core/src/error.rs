//! Error types for rfx-core operations.
//!
//! The [`Error`] enum covers the failure modes of the raster primitives:
//! buffer construction, surface geometry and color parsing.
//!
//! # Usage
//!
//! ```rust
//! use rfx_core::{Error, Result};
//!
//! fn check(width: u32, height: u32) -> Result<()> {
//!     if width == 0 || height == 0 {
//!         return Err(Error::InvalidDimensions { width, height });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by raster primitives.
#[derive(Debug, Error)]
pub enum Error {
    /// Width or height is zero, or the byte count overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Pixel buffer length does not match `width * height * 4`.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::BufferSizeMismatch { expected: 16, actual: 12 };
        assert!(err.to_string().contains("16"));
        assert!(err.to_string().contains("12"));

        let err = Error::InvalidDimensions { width: 0, height: 5 };
        assert_eq!(err.to_string(), "invalid dimensions: 0x5");
    }
}
