//! Error types for the vision pipeline.

use thiserror::Error;

/// Errors raised by pipeline stages and pixel conversions.
///
/// "No detection" is not an error: stages return `Ok(None)` for an empty
/// frame. Source outages are reported by the frame loop, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VisionError {
    /// A buffer does not have the dimensions the stage was set up for.
    ///
    /// This indicates a setup bug (wrong scratch size, wrong source
    /// resolution) and is never silently tolerated.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected shape, e.g. `800x600` or `1920000 bytes`.
        expected: String,
        /// Shape that was supplied.
        actual: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VisionError {
    /// Mismatch between two `width x height` shapes.
    pub fn dimensions(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    /// Mismatch between two raw buffer lengths.
    pub fn buffer_len(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{expected} bytes"),
            actual: format!("{actual} bytes"),
        }
    }
}

/// Fails with [`VisionError::DimensionMismatch`] unless both shapes agree.
pub fn ensure_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<(), VisionError> {
    if expected != actual {
        return Err(VisionError::dimensions(expected, actual));
    }
    Ok(())
}
