//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `tasks` table and its schema version
//! - Write transactions (`BEGIN IMMEDIATE`) for every mutation
//! - Domain events emitted after commits
//!
//! # Architecture
//!
//! The store knows nothing about chain rules. It answers point reads and
//! applies the `ChainPatch` the `chain` module planned, all on one
//! transaction's connection so partial pointer state is never committed.

mod database;
mod error;
pub mod events;

pub use database::{DatabaseService, WriteTransaction, DEFAULT_BUSY_TIMEOUT_MS, SCHEMA_VERSION};
pub use error::DatabaseError;
pub use events::DomainEvent;
