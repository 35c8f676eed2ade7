//! Ordered List Watcher
//!
//! Keeps an always-current, display-ordered view of the task list:
//! - Purely event-driven: wakes only when a `DomainEvent` arrives
//! - Coalesces bursts: any number of queued events cause one refresh
//! - Publishes on a `watch` channel, so readers see only the latest snapshot
//! - Stops when the watcher handle is dropped
//!
//! A refresh that fails (corrupt chain, storage error) publishes the error
//! instead of a snapshot and the watcher keeps running; the next committed
//! mutation triggers another attempt.

use crate::models::TaskRecord;
use crate::services::error::TaskListError;
use crate::services::TaskListService;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{mpsc, watch};

/// Display-ordered tasks plus their count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedSnapshot {
    pub tasks: Vec<TaskRecord>,
    pub count: usize,
}

impl OrderedSnapshot {
    fn new(tasks: Vec<TaskRecord>) -> Self {
        let count = tasks.len();
        Self { tasks, count }
    }
}

/// Latest refresh result
pub type SnapshotResult = Result<OrderedSnapshot, Arc<TaskListError>>;

/// Background task that re-runs order reconstruction after each change
pub struct OrderedListWatcher {
    snapshot_rx: watch::Receiver<SnapshotResult>,
    _shutdown_tx: mpsc::Sender<()>,
}

impl OrderedListWatcher {
    /// Take an initial snapshot and start watching `service` for changes
    ///
    /// Subscribes before the first read, so no mutation committed after this
    /// call starts can be missed.
    pub async fn start(service: Arc<TaskListService>) -> Self {
        let mut events = service.subscribe_to_events();
        let initial = refresh(&service).await;
        let mut last_count = initial.as_ref().map(|s| s.count).ok();

        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased; // Check shutdown first

                    _ = shutdown_rx.recv() => {
                        tracing::debug!("OrderedListWatcher shutting down");
                        break;
                    }

                    event = events.recv() => {
                        match event {
                            Ok(event) => {
                                tracing::debug!("OrderedListWatcher woken by {}", event.event_type());
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::debug!("OrderedListWatcher lagged by {} events", skipped);
                            }
                            Err(RecvError::Closed) => break,
                        }

                        // Coalesce anything else already queued into this refresh
                        loop {
                            match events.try_recv() {
                                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }

                        let result = refresh(&service).await;
                        if let Ok(snapshot) = &result {
                            if last_count != Some(snapshot.count) {
                                tracing::debug!("Task count changed to {}", snapshot.count);
                                last_count = Some(snapshot.count);
                            }
                        }
                        if snapshot_tx.send(result).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            snapshot_rx,
            _shutdown_tx: shutdown_tx,
        }
    }

    /// A receiver that is notified whenever a new snapshot is published
    pub fn subscribe(&self) -> watch::Receiver<SnapshotResult> {
        self.snapshot_rx.clone()
    }

    /// The most recently published result
    pub fn latest(&self) -> SnapshotResult {
        self.snapshot_rx.borrow().clone()
    }
}

async fn refresh(service: &TaskListService) -> SnapshotResult {
    match service.fetch_ordered().await {
        Ok(tasks) => Ok(OrderedSnapshot::new(tasks)),
        Err(e) => {
            tracing::warn!("OrderedListWatcher refresh failed: {}", e);
            Err(Arc::new(e))
        }
    }
}
