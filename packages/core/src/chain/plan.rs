//! Link Maintenance Planners
//!
//! Pure functions that turn a high-level operation (append, delete, move)
//! into the minimal set of pointer writes, computed over a `ChainArena`
//! holding the affected neighborhood.
//!
//! # Move semantics
//!
//! Display order is tail-first. `MoveDirection::Up` places the selected task
//! immediately after the target in chain order (closer to the tail),
//! `MoveDirection::Down` immediately before it (closer to the head).
//!
//! Moves between records that are already neighbors are classified up front
//! (see [`Adjacency`]). A neighbor swap keeps the selected record's original
//! outer link on the target, so no record ends up pointing at itself; a move
//! that would land the record where it already is produces no writes.

use crate::chain::arena::{ChainArena, ChainPatch, LinkUpdate};
use crate::models::{Links, MoveDirection, TaskId};
use serde::Serialize;

/// Position of the selected record relative to the target before a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Adjacency {
    /// Not neighbors
    Apart,
    /// `selected.next == target`
    SelectedBeforeTarget,
    /// `selected.previous == target`
    SelectedAfterTarget,
}

impl Adjacency {
    pub fn classify(selected: TaskId, selected_links: Links, target: TaskId) -> Self {
        if selected.is_none() || target.is_none() {
            Adjacency::Apart
        } else if selected_links.next == target {
            Adjacency::SelectedBeforeTarget
        } else if selected_links.previous == target {
            Adjacency::SelectedAfterTarget
        } else {
            Adjacency::Apart
        }
    }
}

/// Result of planning a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    /// Pointer writes that relocate the selected record
    Splice {
        adjacency: Adjacency,
        patch: ChainPatch,
    },
    /// The selected record already sits on the requested side of the target
    AlreadyInPlace { adjacency: Adjacency },
    /// Selected and target are the same record
    SameTask,
    /// A record the move needs is not present
    MissingRecord { id: TaskId },
}

impl MovePlan {
    pub fn patch(&self) -> Option<&ChainPatch> {
        match self {
            MovePlan::Splice { patch, .. } => Some(patch),
            _ => None,
        }
    }
}

/// Pointer writes for appending `appended` after the current tail
///
/// The new record is inserted with `previous = tail` and `next = 0`; the only
/// remaining write is the old tail's `next`. An empty list needs no writes.
pub fn plan_append(tail: TaskId, appended: TaskId) -> ChainPatch {
    let mut patch = ChainPatch::new();
    if !tail.is_none() && !appended.is_none() {
        patch.push(LinkUpdate {
            id: tail,
            previous: None,
            next: Some(appended),
        });
    }
    patch
}

/// Pointer writes that close the gap left by removing `id`
///
/// The arena must hold `id`; its neighbors are repaired when loaded and
/// skipped (treated as "no link there") when absent. Returns `None` when
/// `id` itself is not in the arena.
pub fn plan_delete(arena: &mut ChainArena, id: TaskId) -> Option<ChainPatch> {
    arena.unlink(id)?;
    arena.forget(id);
    Some(arena.patch())
}

/// Pointer writes that move `selected` next to `target`
///
/// The arena must hold both records plus whatever neighbors of theirs exist.
pub fn plan_move(
    arena: &mut ChainArena,
    selected: TaskId,
    target: TaskId,
    direction: MoveDirection,
) -> MovePlan {
    if selected == target {
        return MovePlan::SameTask;
    }

    let Some(selected_links) = arena.links(selected) else {
        return MovePlan::MissingRecord { id: selected };
    };
    let Some(target_links) = arena.links(target) else {
        return MovePlan::MissingRecord { id: target };
    };

    let adjacency = Adjacency::classify(selected, selected_links, target);

    match (direction, adjacency) {
        (MoveDirection::Up, Adjacency::SelectedAfterTarget)
        | (MoveDirection::Down, Adjacency::SelectedBeforeTarget) => {
            MovePlan::AlreadyInPlace { adjacency }
        }

        // P, S, T, N  ->  P, T, S, N
        (MoveDirection::Up, Adjacency::SelectedBeforeTarget) => {
            let outer_previous = selected_links.previous;
            let outer_next = target_links.next;

            arena.set_links(selected, Links::new(target, outer_next));
            // target inherits the selected record's original previous
            arena.set_links(target, Links::new(outer_previous, selected));
            arena.set_previous(outer_next, selected);
            arena.set_next(outer_previous, target);

            MovePlan::Splice {
                adjacency,
                patch: arena.patch(),
            }
        }

        // P, T, S, N  ->  P, S, T, N
        (MoveDirection::Down, Adjacency::SelectedAfterTarget) => {
            let outer_previous = target_links.previous;
            let outer_next = selected_links.next;

            arena.set_links(selected, Links::new(outer_previous, target));
            // target inherits the selected record's original next
            arena.set_links(target, Links::new(selected, outer_next));
            arena.set_next(outer_previous, selected);
            arena.set_previous(outer_next, target);

            MovePlan::Splice {
                adjacency,
                patch: arena.patch(),
            }
        }

        (direction, Adjacency::Apart) => {
            arena.unlink(selected);
            match direction {
                MoveDirection::Up => arena.link_after(selected, target),
                MoveDirection::Down => arena.link_before(selected, target),
            };

            MovePlan::Splice {
                adjacency,
                patch: arena.patch(),
            }
        }
    }
}
