//! Data Models
//!
//! This module contains the data structures shared by every layer:
//!
//! - `TaskId` - Store-assigned identifier with the `0` "no link" sentinel
//! - `Links` - The previous/next pointer pair carried by each record
//! - `TaskRecord` - One row of the `tasks` table
//! - `MoveDirection` - Display-relative placement for reorder operations

mod task;

pub use task::{Links, MoveDirection, TaskId, TaskRecord};
