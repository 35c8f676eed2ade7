//! Database Connection Management
//!
//! This module provides the record store for the task list: a single
//! `tasks` table in an embedded libsql (SQLite-compatible) database.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging so readers never block the writer
//! - **Busy timeout**: Every connection waits for the write lock instead of failing
//! - **One transaction per mutation**: `WriteTransaction` wraps `BEGIN IMMEDIATE`
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     previous INTEGER NOT NULL DEFAULT 0,
//!     next INTEGER NOT NULL DEFAULT 0,
//!     task TEXT
//! )
//! ```
//!
//! `AUTOINCREMENT` keeps ids monotonic and never reused, so `0` stays free
//! as the "no link" sentinel. `task` is nullable: NULL and `''` differ.
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** It applies the
//! configured busy timeout so concurrent writers wait for the lock.
//!
//! ```no_run
//! # use tasklist_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let db_service = DatabaseService::new(PathBuf::from("./tasks.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::chain::ChainPatch;
use crate::db::error::DatabaseError;
use crate::models::{Links, TaskId, TaskRecord};
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Schema version recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Default busy timeout applied to every connection
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

const TASK_COLUMNS: &str = "id, previous, next, task";

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use tasklist_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_path = PathBuf::from("/path/to/tasklist.db");
///     let db_service = DatabaseService::new(db_path).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    busy_timeout_ms: u64,
}

impl DatabaseService {
    /// Open (or create) the database with the default busy timeout
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable WAL mode and record the schema version
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails or the file has a newer schema version
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS).await
    }

    /// Open (or create) the database with an explicit busy timeout
    pub async fn with_busy_timeout(
        db_path: PathBuf,
        busy_timeout_ms: u64,
    ) -> Result<Self, DatabaseError> {
        if db_path.as_os_str().is_empty() || db_path.is_dir() {
            return Err(DatabaseError::invalid_path(db_path));
        }

        let is_new_database = !db_path.exists();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout_ms,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::info!(
            "Task database ready at {} (new: {})",
            service.db_path.display(),
            is_new_database
        );

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements may return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    async fn read_user_version(&self, conn: &libsql::Connection) -> Result<i64, DatabaseError> {
        let mut rows = conn.query("PRAGMA user_version", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to read user_version: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string())),
            None => Ok(0),
        }
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to call on every open.
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        let found = self.read_user_version(&conn).await?;
        if found > SCHEMA_VERSION {
            return Err(DatabaseError::UnsupportedSchemaVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                previous INTEGER NOT NULL DEFAULT 0,
                next INTEGER NOT NULL DEFAULT 0,
                task TEXT
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create tasks table: {}", e))
        })?;

        // Tail lookup on append
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_next ON tasks(next)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_tasks_next': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_previous ON tasks(previous)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_tasks_previous': {}",
                e
            ))
        })?;

        if found < SCHEMA_VERSION {
            self.execute_pragma(&conn, &format!("PRAGMA user_version = {}", SCHEMA_VERSION))
                .await?;
        }

        // Flush the fresh schema out of the WAL so a second handle opened
        // right away sees the table.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// **⚠️ WARNING**: No busy timeout is set on this connection.
    /// Use `connect_with_timeout()` in async code.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    ///
    /// **✅ RECOMMENDED**: Use this for all async functions.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
        )
        .await?;

        Ok(conn)
    }

    /// Start a write transaction (`BEGIN IMMEDIATE`)
    ///
    /// The write lock is taken up front, so the neighborhood read inside the
    /// transaction cannot go stale before the pointer writes land.
    pub async fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(WriteTransaction {
            conn,
            finished: false,
        })
    }

    //
    // READ OPERATIONS
    // Single statements see a committed snapshot without an explicit transaction.
    //

    /// Retrieve a single task by ID
    pub async fn db_get_task(&self, id: TaskId) -> Result<Option<TaskRecord>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        fetch_task(&conn, id).await
    }

    /// Retrieve every task, unordered (by id)
    ///
    /// The list is small enough to read in full; display order comes from
    /// `chain::order_tail_first`.
    pub async fn db_list_tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to list tasks: {}", e)))?;

        collect_tasks(&mut rows).await
    }

    /// Number of rows in the task table
    pub async fn db_count_tasks(&self) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM tasks", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to count tasks: {}", e)))?;

        let count = match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }
}

/// An open `BEGIN IMMEDIATE` transaction on its own connection
///
/// Finish with [`WriteTransaction::commit`] or [`WriteTransaction::rollback`].
/// Dropping an unfinished transaction closes the connection, which discards
/// the uncommitted writes.
pub struct WriteTransaction {
    conn: libsql::Connection,
    finished: bool,
}

impl WriteTransaction {
    /// Ids of every record with `next = 0`, ascending
    pub async fn tail_ids(&self) -> Result<Vec<TaskId>, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT id FROM tasks WHERE next = 0 ORDER BY id", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to find tail: {}", e)))?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let id = row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            ids.push(TaskId::new(id));
        }
        Ok(ids)
    }

    /// Number of rows, as seen by this transaction
    pub async fn count_tasks(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM tasks", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to count tasks: {}", e)))?;

        let count = match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            None => 0,
        };

        Ok(count.max(0) as u64)
    }

    /// Load one task
    pub async fn load_task(&self, id: TaskId) -> Result<Option<TaskRecord>, DatabaseError> {
        if id.is_none() {
            return Ok(None);
        }
        fetch_task(&self.conn, id).await
    }

    /// Load two tasks in one read (missing ids are simply absent)
    pub async fn load_pair(
        &self,
        first: TaskId,
        second: TaskId,
    ) -> Result<Vec<TaskRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {} FROM tasks WHERE id IN (?, ?)", TASK_COLUMNS),
                (first.get(), second.get()),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to load tasks: {}", e)))?;

        collect_tasks(&mut rows).await
    }

    /// Insert a new record with the given predecessor and `next = 0`
    pub async fn insert_task(&self, previous: TaskId) -> Result<TaskId, DatabaseError> {
        self.conn
            .execute(
                "INSERT INTO tasks (previous, next, task) VALUES (?, 0, NULL)",
                [previous.get()],
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert task: {}", e)))?;

        Ok(TaskId::new(self.conn.last_insert_rowid()))
    }

    /// Set or clear the text of a task; pointers are untouched
    ///
    /// Returns the number of rows affected (0 = task doesn't exist).
    pub async fn update_text(&self, id: TaskId, text: Option<&str>) -> Result<u64, DatabaseError> {
        self.conn
            .execute("UPDATE tasks SET task = ? WHERE id = ?", (text, id.get()))
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update task text: {}", e)))
    }

    /// Delete a task row
    ///
    /// Returns the number of rows affected (0 = task didn't exist).
    pub async fn delete_task(&self, id: TaskId) -> Result<u64, DatabaseError> {
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?", [id.get()])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete task: {}", e)))
    }

    /// Write every pointer update in a patch
    ///
    /// Returns the total number of rows affected.
    pub async fn apply_patch(&self, patch: &ChainPatch) -> Result<u64, DatabaseError> {
        let mut affected = 0;

        for update in patch {
            let result = match (update.previous, update.next) {
                (Some(previous), Some(next)) => {
                    self.conn
                        .execute(
                            "UPDATE tasks SET previous = ?, next = ? WHERE id = ?",
                            (previous.get(), next.get(), update.id.get()),
                        )
                        .await
                }
                (Some(previous), None) => {
                    self.conn
                        .execute(
                            "UPDATE tasks SET previous = ? WHERE id = ?",
                            (previous.get(), update.id.get()),
                        )
                        .await
                }
                (None, Some(next)) => {
                    self.conn
                        .execute(
                            "UPDATE tasks SET next = ? WHERE id = ?",
                            (next.get(), update.id.get()),
                        )
                        .await
                }
                (None, None) => continue,
            };

            affected += result.map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to update links of task {}: {}",
                    update.id, e
                ))
            })?;
        }

        Ok(affected)
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), DatabaseError> {
        self.finished = true;
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            let _rollback = self.conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::sql_execution(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    /// Roll the transaction back
    ///
    /// Failures are logged; the connection is closed either way, which
    /// discards anything uncommitted.
    pub async fn rollback(mut self) {
        self.finished = true;
        if let Err(e) = self.conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Rollback failed: {}", e);
        }
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("Write transaction dropped without commit; changes discarded");
        }
    }
}

async fn fetch_task(
    conn: &libsql::Connection,
    id: TaskId,
) -> Result<Option<TaskRecord>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS),
            [id.get()],
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to get task {}: {}", id, e)))?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        Some(row) => Ok(Some(row_to_task(&row)?)),
        None => Ok(None),
    }
}

async fn collect_tasks(rows: &mut libsql::Rows) -> Result<Vec<TaskRecord>, DatabaseError> {
    let mut tasks = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        tasks.push(row_to_task(&row)?);
    }
    Ok(tasks)
}

/// Convert a `SELECT id, previous, next, task` row
fn row_to_task(row: &libsql::Row) -> Result<TaskRecord, DatabaseError> {
    let column = |e: libsql::Error| DatabaseError::sql_execution(format!("Bad task row: {}", e));

    let id: i64 = row.get(0).map_err(column)?;
    let previous: i64 = row.get(1).map_err(column)?;
    let next: i64 = row.get(2).map_err(column)?;
    let text: Option<String> = row.get(3).map_err(column)?;

    Ok(TaskRecord {
        id: TaskId::new(id),
        links: Links::new(TaskId::new(previous), TaskId::new(next)),
        text,
    })
}
