//! Chain Integrity Errors
//!
//! Raised when the set of records does not form a single linear chain.
//! These are never recovered locally: reconstruction and verification
//! surface them to the caller instead of truncating the list.

use crate::models::TaskId;
use thiserror::Error;

/// Integrity violations detected in the linked chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Records exist but none has `next = 0`
    #[error("Chain has no tail: no record with next = 0 among {count} records")]
    MissingTail { count: usize },

    /// More than one record claims to be the tail
    #[error("Chain has multiple tails: {ids:?}")]
    MultipleTails { ids: Vec<TaskId> },

    /// More than one record claims to be the head
    #[error("Chain has multiple heads: {ids:?}")]
    MultipleHeads { ids: Vec<TaskId> },

    /// A record points at an id that is not in the set
    #[error("Broken link: task {id} points at missing task {missing}")]
    BrokenLink { id: TaskId, missing: TaskId },

    /// The walk revisited a record
    #[error("Cycle detected at task {id}")]
    CycleDetected { id: TaskId },

    /// The walk terminated but left records behind
    #[error("{count} record(s) are not reachable from the tail")]
    Unreachable { count: usize },

    /// `a.next = b` without `b.previous = a` (or the reverse)
    #[error("Link mismatch between task {id} and its neighbor {neighbor}")]
    LinkMismatch { id: TaskId, neighbor: TaskId },
}

impl ChainError {
    /// Create a broken link error
    pub fn broken_link(id: TaskId, missing: TaskId) -> Self {
        Self::BrokenLink { id, missing }
    }

    /// Create a link mismatch error
    pub fn link_mismatch(id: TaskId, neighbor: TaskId) -> Self {
        Self::LinkMismatch { id, neighbor }
    }
}
