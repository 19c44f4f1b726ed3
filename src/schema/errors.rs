//! Schema error types
//!
//! Error codes:
//! - HG_SCHEMA_UNKNOWN_TABLE
//! - HG_SCHEMA_UNKNOWN_COLUMN
//! - HG_SCHEMA_INVALID_DEFINITION
//! - HG_SCHEMA_ROW_INVALID
//! - HG_SCHEMA_MALFORMED_FIXTURE

use std::fmt;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Table name or id not declared in the group
    UnknownTable,
    /// Column name not declared in the table
    UnknownColumn,
    /// Table or index definition is inconsistent
    InvalidDefinition,
    /// Row does not match its table's columns
    RowInvalid,
    /// Fixture file unreadable or not valid JSON
    MalformedFixture,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::UnknownTable => "HG_SCHEMA_UNKNOWN_TABLE",
            SchemaErrorCode::UnknownColumn => "HG_SCHEMA_UNKNOWN_COLUMN",
            SchemaErrorCode::InvalidDefinition => "HG_SCHEMA_INVALID_DEFINITION",
            SchemaErrorCode::RowInvalid => "HG_SCHEMA_ROW_INVALID",
            SchemaErrorCode::MalformedFixture => "HG_SCHEMA_MALFORMED_FIXTURE",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
}

impl SchemaError {
    /// Unknown table
    pub fn unknown_table(table: impl fmt::Display) -> Self {
        Self {
            code: SchemaErrorCode::UnknownTable,
            message: format!("Unknown table '{}'", table),
        }
    }

    /// Unknown column
    pub fn unknown_column(table: &str, column: &str) -> Self {
        Self {
            code: SchemaErrorCode::UnknownColumn,
            message: format!("Table '{}' has no column '{}'", table, column),
        }
    }

    /// Inconsistent table or index definition
    pub fn invalid_definition(reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::InvalidDefinition,
            message: reason.into(),
        }
    }

    /// Row does not fit its table
    pub fn row_invalid(table: &str, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::RowInvalid,
            message: format!("Invalid row for '{}': {}", table, reason.into()),
        }
    }

    /// Fixture could not be read or parsed
    pub fn malformed_fixture(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MalformedFixture,
            message: format!("Malformed fixture '{}': {}", path.into(), reason.into()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
