//! Executor error types
//!
//! Error codes:
//! - HG_ARGUMENT_INVALID: plan construction rejected an argument
//! - HG_WRONG_COLUMN_SHAPE: set operator inputs disagree in column count or type
//! - HG_QUERY_CANCELED / HG_QUERY_TIMEOUT: cooperative interruption
//! - HG_ILLEGAL_STATE: cursor protocol violation
//! - HG_ILLEGAL_NULL_BOUND: ambiguous null bound in an index range
//! - HG_STORAGE_FAILED: storage adapter failure
//!
//! Every error is terminal for the current query.

use thiserror::Error;

use crate::schema::SchemaError;
use crate::storage::StorageError;

/// Result type for executor operations
pub type ExecResult<T> = Result<T, ExecError>;

/// Executor errors
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Wrong column count/type: {0}")]
    ShapeMismatch(String),

    #[error("Query canceled")]
    Cancelled,

    #[error("Query timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    #[error("Illegal cursor state: {0}")]
    IllegalState(String),

    #[error("Illegal null bound: {0}")]
    IllegalNullBound(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ExecError {
    /// Argument error
    pub fn argument(reason: impl Into<String>) -> Self {
        ExecError::Argument(reason.into())
    }

    /// Shape mismatch error
    pub fn shape(reason: impl Into<String>) -> Self {
        ExecError::ShapeMismatch(reason.into())
    }

    /// Cursor protocol violation
    pub fn illegal_state(reason: impl Into<String>) -> Self {
        ExecError::IllegalState(reason.into())
    }

    /// Stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecError::Argument(_) => "HG_ARGUMENT_INVALID",
            ExecError::ShapeMismatch(_) => "HG_WRONG_COLUMN_SHAPE",
            ExecError::Cancelled => "HG_QUERY_CANCELED",
            ExecError::TimedOut { .. } => "HG_QUERY_TIMEOUT",
            ExecError::IllegalState(_) => "HG_ILLEGAL_STATE",
            ExecError::IllegalNullBound(_) => "HG_ILLEGAL_NULL_BOUND",
            ExecError::Storage(_) => "HG_STORAGE_FAILED",
        }
    }

    /// True for cancellation and timeout, which unwind the whole cursor tree
    pub fn is_interruption(&self) -> bool {
        matches!(self, ExecError::Cancelled | ExecError::TimedOut { .. })
    }
}

impl From<SchemaError> for ExecError {
    fn from(err: SchemaError) -> Self {
        ExecError::Argument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ExecError::argument("x").code(), "HG_ARGUMENT_INVALID");
        assert_eq!(ExecError::shape("x").code(), "HG_WRONG_COLUMN_SHAPE");
        assert_eq!(ExecError::Cancelled.code(), "HG_QUERY_CANCELED");
        assert_eq!(ExecError::TimedOut { elapsed_ms: 5 }.code(), "HG_QUERY_TIMEOUT");
        assert_eq!(ExecError::illegal_state("x").code(), "HG_ILLEGAL_STATE");
        assert_eq!(
            ExecError::IllegalNullBound("x".into()).code(),
            "HG_ILLEGAL_NULL_BOUND"
        );
    }

    #[test]
    fn test_interruption() {
        assert!(ExecError::Cancelled.is_interruption());
        assert!(ExecError::TimedOut { elapsed_ms: 1 }.is_interruption());
        assert!(!ExecError::argument("x").is_interruption());
        assert!(!ExecError::illegal_state("x").is_interruption());
    }

    #[test]
    fn test_storage_error_wraps() {
        let err: ExecError = StorageError::read_failed("disk gone").into();
        assert_eq!(err.code(), "HG_STORAGE_FAILED");
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_display() {
        let err = ExecError::TimedOut { elapsed_ms: 250 };
        assert_eq!(err.to_string(), "Query timed out after 250ms");
    }
}
