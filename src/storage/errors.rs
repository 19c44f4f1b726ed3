//! Storage adapter error types
//!
//! Error codes:
//! - HG_STORAGE_ORPHAN_ROW (ERROR severity)
//! - HG_STORAGE_DUPLICATE_KEY (ERROR severity)
//! - HG_STORAGE_READ_FAILED (ERROR severity)
//! - HG_STORAGE_SCHEMA (ERROR severity)

use std::fmt;

use crate::schema::SchemaError;

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Child row whose parent is not stored
    OrphanRow,
    /// A row with the same hkey already exists
    DuplicateKey,
    /// Backend failed to produce rows
    ReadFailed,
    /// Row or lookup rejected by the group schema
    Schema,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::OrphanRow => "HG_STORAGE_ORPHAN_ROW",
            StorageErrorCode::DuplicateKey => "HG_STORAGE_DUPLICATE_KEY",
            StorageErrorCode::ReadFailed => "HG_STORAGE_READ_FAILED",
            StorageErrorCode::Schema => "HG_STORAGE_SCHEMA",
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with context
#[derive(Debug, Clone)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
}

impl StorageError {
    /// Orphan row error
    pub fn orphan_row(table: &str, parent: &str) -> Self {
        Self {
            code: StorageErrorCode::OrphanRow,
            message: format!("Row of '{}' references a missing '{}' row", table, parent),
        }
    }

    /// Duplicate hkey error
    pub fn duplicate_key(hkey: impl fmt::Display) -> Self {
        Self {
            code: StorageErrorCode::DuplicateKey,
            message: format!("Duplicate hkey {}", hkey),
        }
    }

    /// Read failure reported by a backend
    pub fn read_failed(reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::ReadFailed,
            message: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SchemaError> for StorageError {
    fn from(err: SchemaError) -> Self {
        Self {
            code: StorageErrorCode::Schema,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
