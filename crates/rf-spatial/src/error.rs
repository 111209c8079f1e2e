//! Error types for trajectory construction

use rf_core::RfError;
use thiserror::Error;

/// Trajectory error types
#[derive(Error, Debug)]
pub enum SpatialError {
    /// Segment start/length outside the allowed domain
    #[error("Invalid segment span: start {start}, length {length}")]
    InvalidSpan { start: f64, length: f64 },

    /// Motion parameter outside its allowed range
    #[error("Invalid {kind} parameter '{name}': {value} (allowed {min}..={max})")]
    ParamOutOfRange {
        kind: &'static str,
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Invalid position
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    /// Unknown motion kind name
    #[error("Unknown motion kind: {0}")]
    UnknownKind(String),
}

/// Result type for trajectory operations
pub type SpatialResult<T> = Result<T, SpatialError>;

impl From<SpatialError> for RfError {
    fn from(e: SpatialError) -> Self {
        RfError::InvalidParam(e.to_string())
    }
}
