/// Configuration for the task list service
use crate::services::TaskListError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TASKLIST_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "TASKLIST_BUSY_TIMEOUT_MS";
pub const ENV_EVENT_CAPACITY: &str = "TASKLIST_EVENT_CAPACITY";
pub const ENV_MAX_WRITE_RETRIES: &str = "TASKLIST_MAX_WRITE_RETRIES";

/// Retries beyond this turn a locked database into a multi-second stall
const MAX_SUPPORTED_WRITE_RETRIES: u32 = 10;

/// Configuration for the task store, notifier and write retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskListConfig {
    /// Database file
    pub db_path: PathBuf,

    /// How long a connection waits on another writer's lock
    pub busy_timeout_ms: u64,

    /// Broadcast buffer per subscriber before it starts lagging
    pub event_channel_capacity: usize,

    /// Extra attempts for a mutation that hit `SQLITE_BUSY`
    pub max_write_retries: u32,
}

impl Default for TaskListConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: 5000,
            event_channel_capacity: 128,
            max_write_retries: 3,
        }
    }
}

impl TaskListConfig {
    /// Defaults overlaid with `TASKLIST_*` environment variables
    ///
    /// Unparsable or out-of-range values are `TaskListError::InvalidConfig`.
    pub fn from_env() -> Result<Self, TaskListError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup` (keyed by env var name)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TaskListError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            if !path.trim().is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }
        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = parse_var(ENV_BUSY_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_EVENT_CAPACITY) {
            config.event_channel_capacity = parse_var(ENV_EVENT_CAPACITY, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_WRITE_RETRIES) {
            config.max_write_retries = parse_var(ENV_MAX_WRITE_RETRIES, &value)?;
        }

        config.validate().map_err(TaskListError::invalid_config)?;
        Ok(config)
    }

    /// Same settings with a different database file
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.db_path.as_os_str().is_empty() {
            return Err("db_path cannot be empty".to_string());
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.max_write_retries > MAX_SUPPORTED_WRITE_RETRIES {
            return Err(format!(
                "max_write_retries cannot exceed {}",
                MAX_SUPPORTED_WRITE_RETRIES
            ));
        }

        Ok(())
    }
}

/// `~/.tasklist/database/tasklist.db`, or a relative path when there is no home
///
/// - macOS/Linux: ~/.tasklist/database/tasklist.db
/// - Windows: %USERPROFILE%\.tasklist\database\tasklist.db
fn default_db_path() -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(".tasklist").join("database").join("tasklist.db")
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TaskListError> {
    value.trim().parse().map_err(|_| {
        TaskListError::invalid_config(format!("{} has an invalid value: {:?}", key, value))
    })
}
