//! Task List Service
//!
//! The public surface of the crate: append, edit, delete and move on the
//! linked chain, plus the ordered read path and the change notifier.
//!
//! # Write path
//!
//! Every mutation:
//! 1. Takes the in-process write lock (one writer at a time)
//! 2. Opens a `BEGIN IMMEDIATE` transaction
//! 3. Loads the records it touches and their neighbors into a `ChainArena`
//! 4. Plans the pointer writes with `chain::plan_*` and applies the patch
//! 5. Commits, or rolls back on any error
//! 6. Emits one `DomainEvent`
//!
//! Calls with the `0` sentinel return `Ignored` before step 1 and emit nothing.

use crate::chain::{
    order_tail_first, plan_append, plan_delete, plan_move, verify_chain, Adjacency, ChainArena,
    ChainError, ChainSummary, MovePlan,
};
use crate::config::TaskListConfig;
use crate::db::{DatabaseService, DomainEvent, WriteTransaction};
use crate::models::{MoveDirection, TaskId, TaskRecord};
use crate::services::error::TaskListError;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Default subscriber buffer for domain events
pub const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

/// What an `edit` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditOutcome {
    Applied,
    /// Sentinel id; nothing ran
    Ignored,
    NotFound,
}

/// What a `delete` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteOutcome {
    Applied,
    /// Sentinel id; nothing ran
    Ignored,
    NotFound,
}

/// What a `move_task` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum MoveOutcome {
    /// Pointers rewritten; `adjacency` is how the pair sat beforehand
    Applied { adjacency: Adjacency },
    /// The selected task already sits there (or is the target)
    AlreadyInPlace,
    /// Sentinel selected id; nothing ran
    Ignored,
    /// One of the two records does not exist
    NotFound { id: TaskId },
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MoveOutcome::Applied { .. })
    }
}

/// Linked task list over a `DatabaseService`
///
/// Cheap to clone; clones share the database, write lock and event channel.
///
/// # Examples
///
/// ```no_run
/// # use tasklist_core::services::TaskListService;
/// # use tasklist_core::db::DatabaseService;
/// # use tasklist_core::models::MoveDirection;
/// # use std::sync::Arc;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Arc::new(DatabaseService::new("./tasks.db".into()).await?);
/// let service = TaskListService::new(db);
///
/// let first = service.append().await?;
/// let second = service.append().await?;
/// service.edit(second, Some("Write report".to_string())).await?;
/// service.move_task(first, second, MoveDirection::Up).await?;
///
/// for task in service.fetch_ordered().await? {
///     println!("{} {:?}", task.id, task.text);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskListService {
    db: Arc<DatabaseService>,

    /// Serializes mutations within this process
    write_lock: Arc<Mutex<()>>,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<DomainEvent>,
}

impl TaskListService {
    /// Create a service over an open database with the default event capacity
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self::with_event_capacity(db, DOMAIN_EVENT_CHANNEL_CAPACITY)
    }

    /// Create a service with a specific event channel capacity (must be > 0)
    pub fn with_event_capacity(db: Arc<DatabaseService>, capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
            event_tx,
        }
    }

    /// Validate `config`, open its database and build the service
    pub async fn open(config: &TaskListConfig) -> Result<Self, TaskListError> {
        config.validate().map_err(TaskListError::invalid_config)?;

        let db = DatabaseService::with_busy_timeout(config.db_path.clone(), config.busy_timeout_ms)
            .await?;

        Ok(Self::with_event_capacity(
            Arc::new(db),
            config.event_channel_capacity,
        ))
    }

    /// Get access to the underlying database
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Subscribe to domain events
    ///
    /// Every committed mutation sends exactly one event. A receiver that
    /// falls more than the channel capacity behind gets `RecvError::Lagged`.
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Emit a domain event to all subscribers
    ///
    /// Ignores errors if no subscribers (expected in some tests).
    fn emit_event(&self, event: DomainEvent) {
        tracing::debug!("Emitting {} for task {}", event.event_type(), event.task_id());
        let _ = self.event_tx.send(event);
    }

    //
    // MUTATIONS
    //

    /// Append a new, empty task as the chain tail
    ///
    /// The new task shows first in display order. Returns its id.
    pub async fn append(&self) -> Result<TaskId, TaskListError> {
        let _guard = self.write_lock.lock().await;

        let tx = self.db.begin_write().await?;
        let result = append_in(&tx).await;
        let id = finish(tx, result).await?;

        tracing::debug!("Appended task {}", id);
        self.emit_event(DomainEvent::TaskAppended { id });
        Ok(id)
    }

    /// Set (`Some`) or clear (`None`) the text of a task
    ///
    /// Pointers are never touched. `Some("")` and `None` persist differently.
    pub async fn edit(
        &self,
        id: TaskId,
        text: Option<String>,
    ) -> Result<EditOutcome, TaskListError> {
        if id.is_none() {
            tracing::debug!("Ignoring edit of sentinel id");
            return Ok(EditOutcome::Ignored);
        }

        let _guard = self.write_lock.lock().await;

        let tx = self.db.begin_write().await?;
        let result = tx
            .update_text(id, text.as_deref())
            .await
            .map_err(TaskListError::from);
        let affected = finish(tx, result).await?;

        let outcome = if affected == 0 {
            tracing::warn!("Edit of unknown task {}", id);
            EditOutcome::NotFound
        } else {
            EditOutcome::Applied
        };

        self.emit_event(DomainEvent::TaskEdited { id });
        Ok(outcome)
    }

    /// Remove a task and join its former neighbors
    ///
    /// An unknown id changes nothing but still notifies observers.
    pub async fn delete(&self, id: TaskId) -> Result<DeleteOutcome, TaskListError> {
        if id.is_none() {
            tracing::debug!("Ignoring delete of sentinel id");
            return Ok(DeleteOutcome::Ignored);
        }

        let _guard = self.write_lock.lock().await;

        let tx = self.db.begin_write().await?;
        let result = delete_in(&tx, id).await;
        let outcome = finish(tx, result).await?;

        if outcome == DeleteOutcome::NotFound {
            tracing::warn!("Delete of unknown task {}", id);
        }

        self.emit_event(DomainEvent::TaskDeleted {
            id,
            existed: outcome == DeleteOutcome::Applied,
        });
        Ok(outcome)
    }

    /// Move `selected` next to `target`
    ///
    /// `Up` shows the selected task immediately above the target (it becomes
    /// the target's chain successor); `Down` shows it immediately below.
    pub async fn move_task(
        &self,
        selected: TaskId,
        target: TaskId,
        direction: MoveDirection,
    ) -> Result<MoveOutcome, TaskListError> {
        if selected.is_none() {
            tracing::debug!("Ignoring move of sentinel id");
            return Ok(MoveOutcome::Ignored);
        }

        let _guard = self.write_lock.lock().await;

        let tx = self.db.begin_write().await?;
        let result = move_in(&tx, selected, target, direction).await;
        let outcome = finish(tx, result).await?;

        if let MoveOutcome::NotFound { id } = outcome {
            tracing::warn!(
                "Move of {} {} {} skipped: task {} not found",
                selected,
                direction,
                target,
                id
            );
        }

        self.emit_event(DomainEvent::TaskMoved {
            id: selected,
            target,
            direction,
            applied: outcome.is_applied(),
        });
        Ok(outcome)
    }

    //
    // READS
    //

    /// All tasks in display order (tail first)
    ///
    /// # Errors
    ///
    /// `TaskListError::Integrity` when the stored chain is corrupt; the list
    /// is never silently truncated.
    pub async fn fetch_ordered(&self) -> Result<Vec<TaskRecord>, TaskListError> {
        let records = self.db.db_list_tasks().await?;
        order_tail_first(records).map_err(integrity_error)
    }

    /// Check every chain invariant over the stored records
    pub async fn verify_integrity(&self) -> Result<ChainSummary, TaskListError> {
        let records = self.db.db_list_tasks().await?;
        verify_chain(&records).map_err(integrity_error)
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Option<TaskRecord>, TaskListError> {
        if id.is_none() {
            return Ok(None);
        }
        Ok(self.db.db_get_task(id).await?)
    }

    pub async fn count(&self) -> Result<u64, TaskListError> {
        Ok(self.db.db_count_tasks().await?)
    }
}

/// Commit on success, roll back on failure
async fn finish<T>(
    tx: WriteTransaction,
    result: Result<T, TaskListError>,
) -> Result<T, TaskListError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            tx.rollback().await;
            Err(e)
        }
    }
}

fn integrity_error(e: ChainError) -> TaskListError {
    tracing::error!("Task chain integrity violation: {}", e);
    TaskListError::Integrity(e)
}

async fn append_in(tx: &WriteTransaction) -> Result<TaskId, TaskListError> {
    let tails = tx.tail_ids().await?;

    let tail = match tails.as_slice() {
        [] => {
            let count = tx.count_tasks().await?;
            if count > 0 {
                return Err(integrity_error(ChainError::MissingTail {
                    count: count as usize,
                }));
            }
            TaskId::NONE
        }
        [tail] => *tail,
        _ => return Err(integrity_error(ChainError::MultipleTails { ids: tails })),
    };

    let id = tx.insert_task(tail).await?;
    let patch = plan_append(tail, id);
    tracing::debug!("Append patch: {:?}", patch);
    tx.apply_patch(&patch).await?;
    Ok(id)
}

async fn delete_in(tx: &WriteTransaction, id: TaskId) -> Result<DeleteOutcome, TaskListError> {
    let Some(record) = tx.load_task(id).await? else {
        return Ok(DeleteOutcome::NotFound);
    };

    let mut arena = ChainArena::from_records([&record]);
    load_neighbors(tx, &mut arena, &[record.previous(), record.next()]).await?;

    let Some(patch) = plan_delete(&mut arena, id) else {
        return Ok(DeleteOutcome::NotFound);
    };
    tracing::debug!("Delete patch for {}: {:?}", id, patch);

    if tx.delete_task(id).await? == 0 {
        return Ok(DeleteOutcome::NotFound);
    }
    tx.apply_patch(&patch).await?;
    Ok(DeleteOutcome::Applied)
}

async fn move_in(
    tx: &WriteTransaction,
    selected: TaskId,
    target: TaskId,
    direction: MoveDirection,
) -> Result<MoveOutcome, TaskListError> {
    if selected == target {
        return Ok(MoveOutcome::AlreadyInPlace);
    }

    let pair = tx.load_pair(selected, target).await?;
    let mut arena = ChainArena::from_records(&pair);

    let neighbors: Vec<TaskId> = pair
        .iter()
        .flat_map(|r| [r.previous(), r.next()])
        .collect();
    load_neighbors(tx, &mut arena, &neighbors).await?;

    match plan_move(&mut arena, selected, target, direction) {
        MovePlan::Splice { adjacency, patch } => {
            tracing::debug!(
                "Move patch for {} {} {} ({:?}): {:?}",
                selected,
                direction,
                target,
                adjacency,
                patch
            );
            tx.apply_patch(&patch).await?;
            Ok(MoveOutcome::Applied { adjacency })
        }
        MovePlan::AlreadyInPlace { .. } | MovePlan::SameTask => Ok(MoveOutcome::AlreadyInPlace),
        MovePlan::MissingRecord { id } => Ok(MoveOutcome::NotFound { id }),
    }
}

/// Load the given ids into `arena`, skipping the sentinel and ids already held
///
/// A neighbor that a pointer names but the table lacks is left out; the
/// planners then treat that side as "no link".
async fn load_neighbors(
    tx: &WriteTransaction,
    arena: &mut ChainArena,
    ids: &[TaskId],
) -> Result<(), TaskListError> {
    for &id in ids {
        if id.is_none() || arena.contains(id) {
            continue;
        }
        match tx.load_task(id).await? {
            Some(record) => arena.insert(record.id, record.links),
            None => tracing::warn!("Neighbor {} is referenced but missing", id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Links;
    use tempfile::TempDir;

    async fn create_test_service() -> (TaskListService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
        (TaskListService::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_first_append_is_head_and_tail() {
        let (service, _temp) = create_test_service().await;

        let id = service.append().await.unwrap();
        let record = service.get_task(id).await.unwrap().unwrap();

        assert_eq!(record.links, Links::DETACHED);
        assert_eq!(record.text, None);
    }

    #[tokio::test]
    async fn test_sentinel_calls_are_ignored_silently() {
        let (service, _temp) = create_test_service().await;
        let mut rx = service.subscribe_to_events();

        assert_eq!(
            service.edit(TaskId::NONE, Some("x".into())).await.unwrap(),
            EditOutcome::Ignored
        );
        assert_eq!(
            service.delete(TaskId::NONE).await.unwrap(),
            DeleteOutcome::Ignored
        );
        assert_eq!(
            service
                .move_task(TaskId::NONE, TaskId::new(1), MoveDirection::Up)
                .await
                .unwrap(),
            MoveOutcome::Ignored
        );

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_move_onto_itself_is_already_in_place() {
        let (service, _temp) = create_test_service().await;
        let id = service.append().await.unwrap();

        let outcome = service
            .move_task(id, id, MoveDirection::Down)
            .await
            .unwrap();
        assert_eq!(outcome, MoveOutcome::AlreadyInPlace);
    }

    #[tokio::test]
    async fn test_move_to_missing_target_changes_nothing() {
        let (service, _temp) = create_test_service().await;
        let a = service.append().await.unwrap();
        let b = service.append().await.unwrap();

        let outcome = service
            .move_task(a, TaskId::new(99), MoveDirection::Up)
            .await
            .unwrap();

        assert_eq!(outcome, MoveOutcome::NotFound { id: TaskId::new(99) });
        let order: Vec<TaskId> = service
            .fetch_ordered()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(order, vec![b, a]);
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = TaskListConfig::default().with_db_path(temp_dir.path().join("t.db"));
        config.event_channel_capacity = 0;

        let result = TaskListService::open(&config).await;
        assert!(matches!(result, Err(TaskListError::InvalidConfig(_))));
    }
}
