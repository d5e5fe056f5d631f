//! Engine error types

use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Isolate options could not be parsed
    #[error("Invalid isolate options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// Options parsed but describe an unusable isolate
    #[error("Invalid isolate options: {0}")]
    Options(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
