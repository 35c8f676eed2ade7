//! Task Record Data Structures
//!
//! A task record is one row of the `tasks` table. Ordering is not a column:
//! every record carries the ids of its logical predecessor (`previous`) and
//! successor (`next`), forming a doubly-linked chain inside the table.
//!
//! # Sentinel
//!
//! Id `0` is never assigned by the store and means "no link". It is exposed
//! as [`TaskId::NONE`] so the persisted layout and the in-memory model agree.
//!
//! # Examples
//!
//! ```rust
//! use tasklist_core::models::{Links, TaskId, TaskRecord};
//!
//! let record = TaskRecord {
//!     id: TaskId::new(2),
//!     links: Links::new(TaskId::new(1), TaskId::NONE),
//!     text: Some("Buy milk".to_string()),
//! };
//! assert!(record.is_tail());
//! assert!(!record.is_head());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned task identifier
///
/// Ids are positive, monotonically assigned and never reused. `TaskId::NONE`
/// (zero) is the "no link" sentinel used in `previous`/`next` columns and is
/// also the `Default`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// The "no link" sentinel
    pub const NONE: TaskId = TaskId(0);

    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw integer value as stored in the database
    pub const fn get(self) -> i64 {
        self.0
    }

    /// True for the sentinel
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `None` for the sentinel, `Some(self)` otherwise
    pub fn link(self) -> Option<TaskId> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<i64> for TaskId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Predecessor/successor pair of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Links {
    /// Logically-earlier neighbor, `TaskId::NONE` at the chain head
    pub previous: TaskId,
    /// Logically-later neighbor, `TaskId::NONE` at the chain tail
    pub next: TaskId,
}

impl Links {
    pub const DETACHED: Links = Links {
        previous: TaskId::NONE,
        next: TaskId::NONE,
    };

    pub const fn new(previous: TaskId, next: TaskId) -> Self {
        Self { previous, next }
    }
}

/// One row of the task table
///
/// `text` is `None` when the content was cleared (NULL column) and
/// `Some("")` when it was set to an empty string. The two are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    #[serde(flatten)]
    pub links: Links,
    pub text: Option<String>,
}

impl TaskRecord {
    pub fn previous(&self) -> TaskId {
        self.links.previous
    }

    pub fn next(&self) -> TaskId {
        self.links.next
    }

    /// Chain head: no predecessor
    pub fn is_head(&self) -> bool {
        self.links.previous.is_none()
    }

    /// Chain tail: no successor. The tail is shown first.
    pub fn is_tail(&self) -> bool {
        self.links.next.is_none()
    }
}

/// Where a moved task lands relative to its target, in display order
///
/// Display order is tail-first, so `Up` places the selected task closer to
/// the tail (immediately after the target in chain terms) and `Down` places
/// it closer to the head (immediately before the target in chain terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveDirection::Up => "up",
            MoveDirection::Down => "down",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MoveDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(format!("unknown move direction '{}', expected up or down", other)),
        }
    }
}
