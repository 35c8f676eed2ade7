//! Domain Events for the Task List
//!
//! This module defines the events emitted by `TaskListService` after a
//! mutation commits. They follow the observer pattern: any number of
//! subscribers (the ordered-list watcher, the CLI, tests) listen without
//! coupling to the storage layer.
//!
//! # Architecture
//!
//! Events are emitted using tokio's broadcast channel, allowing multiple subscribers
//! to receive notifications asynchronously.
//!
//! # Event Flow
//!
//! 1. `TaskListService` runs a mutation inside one transaction
//! 2. The transaction commits
//! 3. A domain event is emitted via the broadcast channel
//! 4. Subscribers re-run order reconstruction and refresh their view
//!
//! A mutation that fails emits nothing, so observers never refresh onto a
//! state that was rolled back.

use crate::models::{MoveDirection, TaskId};
use serde::{Deserialize, Serialize};

/// Domain events emitted by `TaskListService`
///
/// Every mutating call that reaches the store emits exactly one event, even
/// when it changed nothing (unknown id, move already in place). Only calls
/// with the `0` sentinel are dropped before that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A new record became the tail
    #[serde(rename = "taskAppended")]
    TaskAppended { id: TaskId },

    /// Text was set or cleared (the id may not exist)
    #[serde(rename = "taskEdited")]
    TaskEdited { id: TaskId },

    /// A delete ran; `existed` is false when the id was unknown
    #[serde(rename = "taskDeleted")]
    TaskDeleted { id: TaskId, existed: bool },

    /// A move ran; `applied` is false when no pointer changed
    #[serde(rename = "taskMoved")]
    TaskMoved {
        id: TaskId,
        target: TaskId,
        direction: MoveDirection,
        applied: bool,
    },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::TaskAppended { .. } => "task:appended",
            DomainEvent::TaskEdited { .. } => "task:edited",
            DomainEvent::TaskDeleted { .. } => "task:deleted",
            DomainEvent::TaskMoved { .. } => "task:moved",
        }
    }

    /// The task the event is about
    pub fn task_id(&self) -> TaskId {
        match self {
            DomainEvent::TaskAppended { id }
            | DomainEvent::TaskEdited { id }
            | DomainEvent::TaskDeleted { id, .. }
            | DomainEvent::TaskMoved { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Subscribers outside Rust depend on this flat, tagged shape
    #[test]
    fn test_domain_event_serialization_format() {
        let event = DomainEvent::TaskMoved {
            id: TaskId::new(1),
            target: TaskId::new(3),
            direction: MoveDirection::Up,
            applied: true,
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.get("type").unwrap(), "taskMoved");
        assert_eq!(parsed.get("id").unwrap(), 1);
        assert_eq!(parsed.get("target").unwrap(), 3);
        assert_eq!(parsed.get("direction").unwrap(), "up");
        assert_eq!(parsed.get("applied").unwrap(), true);
        assert!(
            parsed.get("taskMoved").is_none(),
            "Should NOT be nested under 'taskMoved' key"
        );
    }

    #[test]
    fn test_domain_event_deserialization() {
        let json = r#"{"type":"taskDeleted","id":7,"existed":false}"#;
        let event: DomainEvent = serde_json::from_str(json).unwrap();

        assert_eq!(
            event,
            DomainEvent::TaskDeleted {
                id: TaskId::new(7),
                existed: false
            }
        );
        assert_eq!(event.event_type(), "task:deleted");
        assert_eq!(event.task_id(), TaskId::new(7));
    }

    #[test]
    fn test_event_type_names() {
        let id = TaskId::new(1);
        assert_eq!(DomainEvent::TaskAppended { id }.event_type(), "task:appended");
        assert_eq!(DomainEvent::TaskEdited { id }.event_type(), "task:edited");
    }
}
