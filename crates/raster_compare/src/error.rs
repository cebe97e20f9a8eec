//! Error types for raster comparison.

use image::ImageError;
use thiserror::Error;

/// Errors produced while building or comparing rasters.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The two images do not share the same dimensions.
    #[error("size mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A pixel buffer does not hold exactly `width * height` samples.
    #[error("buffer of {len} samples does not fit a {width}x{height} raster")]
    BufferLength { width: u32, height: u32, len: usize },

    /// Tolerance outside of `[0.0, 1.0]` (or NaN).
    #[error("tolerance {0} is outside of [0.0, 1.0]")]
    InvalidTolerance(f64),

    /// The artifact could not be encoded.
    #[error("failed to encode artifact: {0}")]
    Encode(#[from] ImageError),
}

/// Result alias for raster comparison operations.
pub type Result<T> = core::result::Result<T, CompareError>;
