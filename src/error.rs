//! Error types for the library.
//!
//! Policy:
//!
//! - structural and physical-constraint violations fail fast at
//!   construction boundaries (no partial objects)
//! - numerically recoverable situations (clamped depth factor, swapped
//!   resampling bounds) warn and continue instead of erroring
//! - parsers that find no record at all raise rather than returning a
//!   degenerate structure

use std::io;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for all toolkit operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parallel sequences have different lengths
    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    /// Stacked arrays have incompatible shapes
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A physically impossible model (vp <= vs, negative quantity, ...)
    #[error("physical constraint violated: {0}")]
    PhysicalConstraint(String),

    /// Input text or container does not match the expected grammar
    #[error("format error: {0}")]
    Format(String),

    /// Engine-version string outside the supported set
    #[error("unsupported engine version: {0}")]
    UnsupportedVersion(String),

    /// A stream that was expected to contain records contained none
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Out-of-range scalar argument
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
