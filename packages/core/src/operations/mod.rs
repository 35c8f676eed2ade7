//! Task Operations
//!
//! Wrappers that add delivery guarantees on top of `TaskListService`.

pub mod mutation_queue;

pub use mutation_queue::{backoff_delay, MutationQueue};
