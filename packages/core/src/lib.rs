//! Tasklist Core
//!
//! A user-ordered task list stored in a single relational table. The table
//! has no ordering column: each record holds the ids of its predecessor and
//! successor, forming a doubly-linked chain that this crate keeps consistent
//! across append, edit, delete and move.
//!
//! # Architecture
//!
//! - **Chain engine**: Storage-independent arena and planners; every pointer repair is a `ChainPatch`
//! - **libsql**: Embedded SQLite-compatible database, WAL mode, one `BEGIN IMMEDIATE` per mutation
//! - **Tail-first display**: The most recently appended task shows first, adjusted by moves
//! - **Observers**: Domain events on a tokio broadcast channel after every commit
//!
//! # Modules
//!
//! - [`models`] - Data structures (TaskId, TaskRecord, MoveDirection)
//! - [`chain`] - Linked chain engine (planning, reconstruction, verification)
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - TaskListService and the ordered list watcher
//! - [`operations`] - Retry wrapper for mutations under lock contention
//! - [`config`] - Service configuration

pub mod chain;
pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use chain::{ChainError, ChainSummary};
pub use config::TaskListConfig;
pub use models::*;
pub use services::*;
