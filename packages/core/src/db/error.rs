//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, schema initialization and statement failures.
/// Chain integrity problems are not database errors; see `ChainError`.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// The file was written by a newer schema than this build understands
    #[error("Unsupported schema version {found} (this build supports up to {supported})")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    /// Invalid database path provided
    #[error("Invalid database path: {path}")]
    InvalidPath { path: PathBuf },

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// Another writer holds the database lock past the busy timeout
    #[error("Database is busy: {context}")]
    Busy { context: String },

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(path: PathBuf) -> Self {
        Self::InvalidPath { path }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    ///
    /// Lock contention (`SQLITE_BUSY` / `SQLITE_LOCKED`) is classified as
    /// [`DatabaseError::Busy`] so callers can retry it.
    pub fn sql_execution(context: impl Into<String>) -> Self {
        let context = context.into();
        if is_busy_message(&context) {
            Self::Busy { context }
        } else {
            Self::SqlExecutionError { context }
        }
    }

    /// True for transient lock contention that is worth retrying
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Busy { .. } => true,
            Self::LibsqlError(e) => is_busy_message(&e.to_string()),
            _ => false,
        }
    }
}

fn is_busy_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("sqlite_locked")
}
