//! Linked Chain Engine
//!
//! Storage-independent core of the task list. Records form a doubly-linked
//! chain through their `previous`/`next` ids; this module owns every rule
//! about how those pointers change and how display order is recovered.
//!
//! - [`arena`] - id-keyed working set with change tracking (`ChainArena`, `ChainPatch`)
//! - [`plan`] - append/delete/move planners producing pointer patches
//! - [`reconstruct`] - tail-first ordering and full invariant verification
//! - [`error`] - integrity violations (`ChainError`)
//!
//! The service layer loads a neighborhood from the database, plans here,
//! and writes the resulting patch inside one transaction.

pub mod arena;
pub mod error;
pub mod plan;
pub mod reconstruct;

pub use arena::{ChainArena, ChainPatch, LinkUpdate};
pub use error::ChainError;
pub use plan::{plan_append, plan_delete, plan_move, Adjacency, MovePlan};
pub use reconstruct::{order_tail_first, verify_chain, ChainSummary};
