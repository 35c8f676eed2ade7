//! Mutation queue with retry logic for lock contention
//!
//! This module provides a wrapper around `TaskListService` that retries a
//! mutation when the database reports `SQLITE_BUSY` (another connection held
//! the write lock past the busy timeout).
//!
//! # Why This Is Needed
//!
//! The service serializes writers inside one process, but a second process
//! (or a long-running reader checkpointing the WAL) can still hold the lock.
//! A busy failure rolls the whole transaction back, so re-running the
//! mutation from scratch is always safe.
//!
//! # Example
//!
//! ```no_run
//! use tasklist_core::operations::MutationQueue;
//! use tasklist_core::services::TaskListService;
//! use tasklist_core::TaskListConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(TaskListService::open(&TaskListConfig::default()).await?);
//!
//! // Retry up to 3 times with exponential backoff (10ms, 20ms, 40ms)
//! let queue = MutationQueue::new(service, 3);
//! let id = queue.append().await?;
//! # Ok(())
//! # }
//! ```

use crate::models::{MoveDirection, TaskId};
use crate::services::{DeleteOutcome, EditOutcome, MoveOutcome, TaskListError, TaskListService};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;

/// Backoff before retry number `attempt + 1`: 10ms, 20ms, 40ms, 80ms, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(10u64 << attempt.min(16))
}

/// Queue for running mutations with automatic retry on lock contention
pub struct MutationQueue {
    service: Arc<TaskListService>,

    /// Maximum number of retry attempts (0 = single attempt, no retries)
    max_retries: u32,
}

impl MutationQueue {
    pub fn new(service: Arc<TaskListService>, max_retries: u32) -> Self {
        Self {
            service,
            max_retries,
        }
    }

    pub fn service(&self) -> &Arc<TaskListService> {
        &self.service
    }

    pub async fn append(&self) -> Result<TaskId, TaskListError> {
        let service: &TaskListService = &self.service;
        self.with_retry("append", move || service.append()).await
    }

    pub async fn edit(
        &self,
        id: TaskId,
        text: Option<String>,
    ) -> Result<EditOutcome, TaskListError> {
        let service: &TaskListService = &self.service;
        self.with_retry("edit", move || service.edit(id, text.clone()))
            .await
    }

    pub async fn delete(&self, id: TaskId) -> Result<DeleteOutcome, TaskListError> {
        let service: &TaskListService = &self.service;
        self.with_retry("delete", move || service.delete(id)).await
    }

    pub async fn move_task(
        &self,
        selected: TaskId,
        target: TaskId,
        direction: MoveDirection,
    ) -> Result<MoveOutcome, TaskListError> {
        let service: &TaskListService = &self.service;
        self.with_retry("move", move || {
            service.move_task(selected, target, direction)
        })
        .await
    }

    /// Run `operation` until it succeeds, fails with a non-busy error, or
    /// `max_retries` retries are spent
    ///
    /// # Retry Behavior
    ///
    /// - **Retry on**: `DatabaseError::Busy` only
    /// - **Backoff**: Exponential (10ms, 20ms, 40ms, 80ms, ...)
    /// - **Other errors**: Fail immediately without retry
    async fn with_retry<T, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, TaskListError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TaskListError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            "{} succeeded after {} retry(ies)",
                            operation_name,
                            attempt
                        );
                    }
                    return Ok(value);
                }

                Err(e) if e.is_busy() && attempt < self.max_retries => {
                    let backoff = backoff_delay(attempt);
                    tracing::debug!(
                        "Database busy on attempt {}/{} of {}. Retrying in {:?}...",
                        attempt + 1,
                        self.max_retries + 1,
                        operation_name,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }

                Err(e) => {
                    if e.is_busy() {
                        tracing::warn!(
                            "Max retries ({}) exceeded for {} operation",
                            self.max_retries,
                            operation_name
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
