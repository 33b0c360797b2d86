//! Error types for the analysis and synthesis engines

use std::fmt;

/// Errors that can occur during feature extraction or synthesis
#[derive(Debug, Clone, PartialEq)]
pub enum DspError {
    /// Invalid configuration (degenerate mel filter, out-of-range FIR design
    /// parameters, non-positive tract length, ...). Fatal: initialization is aborted.
    Configuration(String),

    /// Fewer than one full step of unconsumed audio remains.
    /// Recoverable: load more audio or stop.
    InsufficientInput(String),

    /// A gabor tap index exceeded the allocated output tensor extent
    ShapeOverflow(String),

    /// Invalid input data (empty buffer, wrong slice length, ...)
    InvalidInput(String),

    /// A phone or word is missing from a lookup table
    NotFound(String),
}

impl fmt::Display for DspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DspError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            DspError::InsufficientInput(msg) => write!(f, "Insufficient input: {}", msg),
            DspError::ShapeOverflow(msg) => write!(f, "Shape overflow: {}", msg),
            DspError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DspError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for DspError {}

impl DspError {
    /// True for errors the caller can recover from by supplying more audio
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DspError::InsufficientInput(_))
    }
}
