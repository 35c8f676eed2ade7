//! Service Layer Error Types
//!
//! Errors surfaced by `TaskListService`. Unknown ids are not errors; they
//! come back as outcomes (see `DeleteOutcome::NotFound` and friends).

use crate::chain::ChainError;
use crate::db::DatabaseError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum TaskListError {
    /// The stored chain breaks an invariant; fatal to the call that found it
    #[error("Task chain integrity violation: {0}")]
    Integrity(#[from] ChainError),

    /// Storage failed; the transaction was rolled back
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration rejected before opening the store
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TaskListError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for lock contention worth retrying
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Database(e) if e.is_busy())
    }

    /// True when the stored chain is corrupt
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}
