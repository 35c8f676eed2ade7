//! Chain Arena
//!
//! An in-memory, id-keyed view of the neighborhood a mutation touches.
//! Planners load the affected records into a `ChainArena`, rewrite their
//! links with the primitives below, and read back a `ChainPatch` holding
//! only the fields that changed. The patch is what gets written to storage,
//! so every pointer repair lives here and is testable without a database.

use crate::models::{Links, TaskId, TaskRecord};
use serde::Serialize;
use std::collections::HashMap;

/// New pointer values for one record
///
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdate {
    pub id: TaskId,
    pub previous: Option<TaskId>,
    pub next: Option<TaskId>,
}

/// Ordered set of pointer writes produced by a planner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainPatch {
    updates: Vec<LinkUpdate>,
}

impl ChainPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: LinkUpdate) {
        self.updates.push(update);
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn updates(&self) -> &[LinkUpdate] {
        &self.updates
    }

    /// Update for a specific record, if the patch touches it
    pub fn get(&self, id: TaskId) -> Option<&LinkUpdate> {
        self.updates.iter().find(|u| u.id == id)
    }
}

impl<'a> IntoIterator for &'a ChainPatch {
    type Item = &'a LinkUpdate;
    type IntoIter = std::slice::Iter<'a, LinkUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.iter()
    }
}

/// Id-to-links mapping with change tracking
#[derive(Debug, Clone, Default)]
pub struct ChainArena {
    original: HashMap<TaskId, Links>,
    current: HashMap<TaskId, Links>,
    /// First-touch order, so patches are written in the order they were planned
    touched: Vec<TaskId>,
}

impl ChainArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TaskRecord>) -> Self {
        let mut arena = Self::new();
        for record in records {
            arena.insert(record.id, record.links);
        }
        arena
    }

    /// Register a record as loaded from storage
    ///
    /// The sentinel id is never stored.
    pub fn insert(&mut self, id: TaskId, links: Links) {
        if id.is_none() {
            return;
        }
        self.original.insert(id, links);
        self.current.insert(id, links);
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.current.contains_key(&id)
    }

    pub fn links(&self, id: TaskId) -> Option<Links> {
        self.current.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Set `previous` on `id`
    ///
    /// Writing toward the sentinel is a no-op. An id that was not loaded is
    /// treated as "no record there": the write is skipped and `false` returned.
    pub fn set_previous(&mut self, id: TaskId, previous: TaskId) -> bool {
        self.modify(id, |links| links.previous = previous)
    }

    /// Set `next` on `id`, same rules as [`ChainArena::set_previous`]
    pub fn set_next(&mut self, id: TaskId, next: TaskId) -> bool {
        self.modify(id, |links| links.next = next)
    }

    /// Overwrite both pointers of `id`
    pub fn set_links(&mut self, id: TaskId, links: Links) -> bool {
        self.modify(id, |current| *current = links)
    }

    /// Gap repair: connect the neighbors of `id` directly to each other
    ///
    /// `id` is left detached (both pointers zero). Returns its old links.
    pub fn unlink(&mut self, id: TaskId) -> Option<Links> {
        let old = self.links(id)?;

        self.set_next(old.previous, old.next);
        self.set_previous(old.next, old.previous);
        self.set_links(id, Links::DETACHED);

        Some(old)
    }

    /// Place a detached `id` immediately after `anchor` in chain order
    pub fn link_after(&mut self, id: TaskId, anchor: TaskId) -> bool {
        let Some(anchor_links) = self.links(anchor) else {
            return false;
        };
        let successor = anchor_links.next;

        self.set_links(id, Links::new(anchor, successor));
        self.set_next(anchor, id);
        self.set_previous(successor, id);
        true
    }

    /// Place a detached `id` immediately before `anchor` in chain order
    pub fn link_before(&mut self, id: TaskId, anchor: TaskId) -> bool {
        let Some(anchor_links) = self.links(anchor) else {
            return false;
        };
        let predecessor = anchor_links.previous;

        self.set_links(id, Links::new(predecessor, anchor));
        self.set_previous(anchor, id);
        self.set_next(predecessor, id);
        true
    }

    /// Drop a record from the arena entirely (it is being deleted)
    ///
    /// Forgotten records never appear in the patch.
    pub fn forget(&mut self, id: TaskId) {
        self.original.remove(&id);
        self.current.remove(&id);
        self.touched.retain(|touched| *touched != id);
    }

    /// Changed fields of every touched record, in first-touch order
    pub fn patch(&self) -> ChainPatch {
        let mut patch = ChainPatch::new();

        for id in &self.touched {
            let (Some(before), Some(after)) = (self.original.get(id), self.current.get(id)) else {
                continue;
            };

            let previous = (before.previous != after.previous).then_some(after.previous);
            let next = (before.next != after.next).then_some(after.next);

            if previous.is_some() || next.is_some() {
                patch.push(LinkUpdate {
                    id: *id,
                    previous,
                    next,
                });
            }
        }

        patch
    }

    fn modify(&mut self, id: TaskId, f: impl FnOnce(&mut Links)) -> bool {
        if id.is_none() {
            return false;
        }

        let Some(links) = self.current.get_mut(&id) else {
            tracing::warn!("Task {} is not loaded; skipping pointer write toward it", id);
            return false;
        };

        f(links);
        if !self.touched.contains(&id) {
            self.touched.push(id);
        }
        true
    }
}
