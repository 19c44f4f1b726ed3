//! CLI-specific error types
//!
//! All CLI errors are fatal: the command prints one error object and exits
//! non-zero.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::executor::ExecError;
use crate::schema::SchemaError;
use crate::storage::StorageError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// Fixture could not be loaded
    FixtureError,
    /// Bad command line value
    InvalidArgument,
    /// Query failed
    QueryFailed,
    /// I/O error (stdout)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "HG_CLI_CONFIG_ERROR",
            Self::FixtureError => "HG_CLI_FIXTURE_ERROR",
            Self::InvalidArgument => "HG_CLI_INVALID_ARGUMENT",
            Self::QueryFailed => "HG_CLI_QUERY_FAILED",
            Self::IoError => "HG_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Invalid command line value
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(CliErrorCode::ConfigError, e.to_string())
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::new(CliErrorCode::FixtureError, e.to_string())
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::new(CliErrorCode::FixtureError, e.to_string())
    }
}

impl From<ExecError> for CliError {
    fn from(e: ExecError) -> Self {
        Self::new(CliErrorCode::QueryFailed, format!("{}: {}", e.code(), e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_error_keeps_code() {
        let err: CliError = ExecError::Cancelled.into();
        assert_eq!(err.code_str(), "HG_CLI_QUERY_FAILED");
        assert!(err.message().starts_with("HG_QUERY_CANCELED"));
    }

    #[test]
    fn test_display() {
        let err = CliError::invalid_argument("bad bound");
        assert_eq!(err.to_string(), "HG_CLI_INVALID_ARGUMENT: bad bound");
    }
}
