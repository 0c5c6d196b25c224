// Copyright 2025 Silica Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for Silica
//!
//! This module defines all error types used throughout the storage layer.

use thiserror::Error;

/// Result type alias for Silica operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Silica storage operations
///
/// This enum covers all error cases including both sentinel errors
/// and structured errors with context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Table errors
    // =========================================================================
    /// Table not found in the catalog
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Table already exists when trying to create
    #[error("table '{0}' already exists")]
    TableAlreadyExists(String),

    /// Database not found in the catalog
    #[error("database '{0}' not found")]
    DatabaseNotFound(String),

    // =========================================================================
    // Column errors
    // =========================================================================
    /// Column not found in table schema
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Invalid column type for operation
    #[error("invalid column type")]
    InvalidColumnType,

    /// Table column count mismatch
    #[error("table columns don't match, expected {expected}, got {got}")]
    TableColumnsNotMatch { expected: usize, got: usize },

    // =========================================================================
    // Query errors
    // =========================================================================
    /// Statement is malformed or targets the wrong kind of storage
    #[error("incorrect query: {0}")]
    IncorrectQuery(String),

    /// Arguments of a statement are invalid
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// Operation is recognized but deliberately unsupported
    #[error("not implemented: {0}")]
    NotImplemented(String),

    // =========================================================================
    // Materialized view errors
    // =========================================================================
    /// Dependent-view cap on a source table exceeded
    #[error("too many materialized views, maximum: {maximum}")]
    TooManyMaterializedViews { maximum: u64 },

    // =========================================================================
    // Engine errors
    // =========================================================================
    /// Engine name not registered in the storage registry
    #[error("unknown storage engine: {0}")]
    UnknownStorageEngine(String),

    // =========================================================================
    // Lock errors
    // =========================================================================
    /// Failed to acquire a table lock within the configured timeout
    #[error("failed to acquire lock on '{table}' within {timeout_ms} ms")]
    LockAcquisitionTimeout { table: String, timeout_ms: u64 },

    // =========================================================================
    // Other errors
    // =========================================================================
    /// Operation not supported by this storage
    #[error("not supported: {0}")]
    NotSupported(String),

    /// IO error (wrapped)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error for invariant violations and unexpected conditions
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new TableColumnsNotMatch error
    pub fn table_columns_not_match(expected: usize, got: usize) -> Self {
        Error::TableColumnsNotMatch { expected, got }
    }

    /// Create a new IncorrectQuery error
    pub fn incorrect_query(message: impl Into<String>) -> Self {
        Error::IncorrectQuery(message.into())
    }

    /// Create a new BadArguments error
    pub fn bad_arguments(message: impl Into<String>) -> Self {
        Error::BadArguments(message.into())
    }

    /// Create a new NotImplemented error
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Error::NotImplemented(message.into())
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TableNotFound(_) | Error::DatabaseNotFound(_) | Error::ColumnNotFound(_)
        )
    }

    /// Check if this is a fatal statement-level error (propagated to the client)
    pub fn is_statement_error(&self) -> bool {
        matches!(
            self,
            Error::IncorrectQuery(_)
                | Error::BadArguments(_)
                | Error::NotImplemented(_)
                | Error::TooManyMaterializedViews { .. }
                | Error::UnknownStorageEngine(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::TableNotFound("events".to_string()).to_string(),
            "table 'events' not found"
        );
        assert_eq!(
            Error::TableAlreadyExists("events".to_string()).to_string(),
            "table 'events' already exists"
        );
        assert_eq!(
            Error::ColumnNotFound("ts".to_string()).to_string(),
            "column 'ts' not found"
        );
        assert_eq!(
            Error::TooManyMaterializedViews { maximum: 3 }.to_string(),
            "too many materialized views, maximum: 3"
        );
        assert_eq!(
            Error::UnknownStorageEngine("Foo".to_string()).to_string(),
            "unknown storage engine: Foo"
        );
    }

    #[test]
    fn test_structured_error_display() {
        let err = Error::table_columns_not_match(5, 3);
        assert_eq!(
            err.to_string(),
            "table columns don't match, expected 5, got 3"
        );

        let err = Error::LockAcquisitionTimeout {
            table: "events".to_string(),
            timeout_ms: 1000,
        };
        assert_eq!(
            err.to_string(),
            "failed to acquire lock on 'events' within 1000 ms"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::TableNotFound("t".to_string()).is_not_found());
        assert!(Error::DatabaseNotFound("db".to_string()).is_not_found());
        assert!(!Error::incorrect_query("x").is_not_found());

        assert!(Error::incorrect_query("x").is_statement_error());
        assert!(Error::bad_arguments("x").is_statement_error());
        assert!(Error::not_implemented("x").is_statement_error());
        assert!(!Error::TableNotFound("t".to_string()).is_statement_error());
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            Error::TableNotFound("t".to_string()),
            Error::TableNotFound("t".to_string())
        );
        assert_ne!(
            Error::TableNotFound("t".to_string()),
            Error::TableAlreadyExists("t".to_string())
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("file not found"));
    }
}
