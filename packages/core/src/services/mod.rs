//! Business Services
//!
//! This module contains the task list services:
//!
//! - `TaskListService` - append/edit/delete/move, ordered reads and domain events
//! - `OrderedListWatcher` - background task keeping a display-ordered snapshot current
//!
//! Services coordinate between the database layer and the chain engine,
//! running each mutation as one transaction.

pub mod error;
pub mod ordered_list_watcher;
pub mod task_list_service;

pub use error::TaskListError;
pub use ordered_list_watcher::{OrderedListWatcher, OrderedSnapshot, SnapshotResult};
pub use task_list_service::{
    DeleteOutcome, EditOutcome, MoveOutcome, TaskListService, DOMAIN_EVENT_CHANNEL_CAPACITY,
};
