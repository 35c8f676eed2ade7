//! Order Reconstruction
//!
//! Turns the unordered contents of the task table into display order by
//! walking the chain from the tail (`next = 0`) back through `previous`.
//!
//! The walk uses an id-keyed map, removes each record as it is emitted and
//! is bounded by the input size, so corrupted data (two tails, a cycle, a
//! dangling pointer) ends in a `ChainError` instead of a truncated list or
//! a loop that never terminates.

use crate::chain::error::ChainError;
use crate::models::{TaskId, TaskRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Shape of a verified chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    pub len: usize,
    pub head: Option<TaskId>,
    pub tail: Option<TaskId>,
}

/// Order records tail-first (most recently appended first, adjusted by moves)
///
/// # Errors
///
/// - `MissingTail` / `MultipleTails` when there is not exactly one `next = 0`
/// - `BrokenLink` when a `previous` pointer names an id not in the set
/// - `CycleDetected` when the walk returns to an emitted record
/// - `Unreachable` when records are left over after reaching the head
pub fn order_tail_first(records: Vec<TaskRecord>) -> Result<Vec<TaskRecord>, ChainError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let bound = records.len();
    let mut tails: Vec<TaskId> = records
        .iter()
        .filter(|r| r.is_tail())
        .map(|r| r.id)
        .collect();

    let tail = match tails.len() {
        0 => return Err(ChainError::MissingTail { count: bound }),
        1 => tails[0],
        _ => {
            tails.sort();
            return Err(ChainError::MultipleTails { ids: tails });
        }
    };

    let mut remaining: HashMap<TaskId, TaskRecord> =
        records.into_iter().map(|r| (r.id, r)).collect();
    let mut emitted: HashSet<TaskId> = HashSet::with_capacity(bound);
    let mut ordered = Vec::with_capacity(bound);

    let mut current = remaining
        .remove(&tail)
        .ok_or(ChainError::MissingTail { count: bound })?;

    // Each step removes one record from `remaining`, so the loop runs at most `bound` times.
    loop {
        let previous = current.previous();
        emitted.insert(current.id);
        let current_id = current.id;
        ordered.push(current);

        if previous.is_none() {
            break;
        }

        current = match remaining.remove(&previous) {
            Some(record) => record,
            None if emitted.contains(&previous) => {
                return Err(ChainError::CycleDetected { id: previous })
            }
            None => return Err(ChainError::broken_link(current_id, previous)),
        };
    }

    if !remaining.is_empty() {
        return Err(ChainError::Unreachable {
            count: remaining.len(),
        });
    }

    Ok(ordered)
}

/// Check every chain invariant over the full record set
///
/// Stricter than [`order_tail_first`]: also requires a unique head and that
/// `a.next = b` holds exactly when `b.previous = a`.
pub fn verify_chain(records: &[TaskRecord]) -> Result<ChainSummary, ChainError> {
    if records.is_empty() {
        return Ok(ChainSummary {
            len: 0,
            head: None,
            tail: None,
        });
    }

    let by_id: HashMap<TaskId, &TaskRecord> = records.iter().map(|r| (r.id, r)).collect();

    let mut heads: Vec<TaskId> = records.iter().filter(|r| r.is_head()).map(|r| r.id).collect();
    let mut tails: Vec<TaskId> = records.iter().filter(|r| r.is_tail()).map(|r| r.id).collect();
    heads.sort();
    tails.sort();

    if tails.is_empty() {
        return Err(ChainError::MissingTail {
            count: records.len(),
        });
    }
    if tails.len() > 1 {
        return Err(ChainError::MultipleTails { ids: tails });
    }
    if heads.len() > 1 {
        return Err(ChainError::MultipleHeads { ids: heads });
    }

    for record in records {
        if let Some(next) = record.next().link() {
            let neighbor = by_id
                .get(&next)
                .ok_or_else(|| ChainError::broken_link(record.id, next))?;
            if neighbor.previous() != record.id {
                return Err(ChainError::link_mismatch(record.id, next));
            }
        }
        if let Some(previous) = record.previous().link() {
            let neighbor = by_id
                .get(&previous)
                .ok_or_else(|| ChainError::broken_link(record.id, previous))?;
            if neighbor.next() != record.id {
                return Err(ChainError::link_mismatch(record.id, previous));
            }
        }
    }

    // Mutual links with one head and one tail can still hide a detached ring.
    let Some(head) = heads.first().copied() else {
        return Err(ChainError::CycleDetected { id: tails[0] });
    };

    let mut visited = HashSet::with_capacity(records.len());
    let mut cursor = head;
    while !cursor.is_none() {
        if !visited.insert(cursor) {
            return Err(ChainError::CycleDetected { id: cursor });
        }
        cursor = by_id
            .get(&cursor)
            .map(|r| r.next())
            .unwrap_or(TaskId::NONE);
    }

    if visited.len() != records.len() {
        return Err(ChainError::Unreachable {
            count: records.len() - visited.len(),
        });
    }

    Ok(ChainSummary {
        len: records.len(),
        head: Some(head),
        tail: Some(tails[0]),
    })
}
