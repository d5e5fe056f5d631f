//! Error types for the isobridge boundary

use crate::types::ExceptionError;
use crate::value::{CtxRef, ValueRef};

/// Result type for boundary operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Boundary error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// The engine threw while performing the operation
    #[error(transparent)]
    Exception(#[from] ExceptionError),

    /// No live context is registered under this reference
    #[error("Unknown context reference: {0}")]
    UnknownContext(CtxRef),

    /// The reference does not resolve (released, or its context is gone)
    #[error("Value {0} is not tracked")]
    ValueReleased(ValueRef),

    /// A native callback could not be mapped back to host identity
    #[error("Callback identity resolution failed: {0}")]
    Resolution(String),

    /// Operation applied to the wrong kind of template
    #[error("Template kind mismatch: expected {expected}, got {got}")]
    TemplateKind {
        /// Kind the operation needs
        expected: &'static str,
        /// Kind that was passed
        got: &'static str,
    },

    /// Template was created on a different isolate
    #[error("Template belongs to another isolate")]
    ForeignTemplate,

    /// Value is not an object
    #[error("Value {0} is not an object")]
    NotAnObject(ValueRef),

    /// Value is not callable
    #[error("Value {0} is not a function")]
    NotAFunction(ValueRef),

    /// Value is not a symbol
    #[error("Value {0} is not a symbol")]
    NotASymbol(ValueRef),

    /// Internal field access past the object's field count
    #[error("Internal field {index} out of range (object has {count})")]
    InternalFieldOutOfRange {
        /// Requested field
        index: usize,
        /// Fields the object carries
        count: usize,
    },

    /// Builtin symbol index outside the enumerated set
    #[error("Invalid symbol index: {0}")]
    InvalidSymbolIndex(i32),

    /// Malformed argument at the C boundary
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BridgeError {
    /// The captured exception, if this error came from the engine
    pub fn as_exception(&self) -> Option<&ExceptionError> {
        match self {
            BridgeError::Exception(e) => Some(e),
            _ => None,
        }
    }
}
