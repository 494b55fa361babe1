//! Error types for reconstruction operators.
//!
//! Only malformed inputs are errors. Out-of-FOV motion, zero interpolation
//! coverage and solver breakdown are reported through values instead.

use thiserror::Error;

/// Main error type for operator construction and application.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconError {
    /// A buffer length does not match the operator it is passed to.
    #[error("Dimension mismatch for {what}: expected {expected} elements, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A parameter or input value is outside its valid domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A multi-frame operator was built without any time frame.
    #[error("Multi-frame operator needs at least one time frame")]
    NoFrames,
}

/// Result type for reconstruction operations.
pub type Result<T> = std::result::Result<T, ReconError>;

impl ReconError {
    /// Create a dimension mismatch error.
    pub fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { what, expected, actual }
    }

    /// Create an invalid parameter error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Fail fast when `actual` differs from `expected`.
#[inline]
pub fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ReconError::dimension(what, expected, actual));
    }
    Ok(())
}
