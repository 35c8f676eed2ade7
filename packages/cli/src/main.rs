//! Tasklist command-line front end
//!
//! Drives `TaskListService` from the shell. Every mutation goes through a
//! `MutationQueue`, so a database locked by another process is retried
//! before the command gives up.
//!
//! # Usage
//!
//! ```bash
//! tasklist add "Buy milk"
//! tasklist add "Call the bank"
//! tasklist list
//! tasklist move 1 2 up
//! tasklist edit 2 --clear
//! tasklist delete 1
//! tasklist check
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=tasklist_core=debug` to see planned patches.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tasklist_core::models::{MoveDirection, TaskId, TaskRecord};
use tasklist_core::operations::MutationQueue;
use tasklist_core::services::{DeleteOutcome, EditOutcome, MoveOutcome, TaskListService};
use tasklist_core::TaskListConfig;
use tracing_subscriber::EnvFilter;

/// Tasklist - an ordered task list kept as a linked chain in SQLite
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file (default: ~/.tasklist/database/tasklist.db)
    #[arg(long, env = "TASKLIST_DB_PATH", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append a task; it shows at the top of the list
    ///
    /// With TEXT this is an append followed by a separate edit, so a failed
    /// edit leaves an empty task behind.
    Add {
        /// Initial text
        text: Option<String>,
    },

    /// Set or clear a task's text
    Edit {
        id: i64,

        /// New text (may be empty)
        #[arg(required_unless_present = "clear")]
        text: Option<String>,

        /// Clear the text instead of setting it
        #[arg(long, conflicts_with = "text")]
        clear: bool,
    },

    /// Delete a task
    Delete { id: i64 },

    /// Move SELECTED directly above (up) or below (down) TARGET
    Move {
        selected: i64,
        target: i64,
        direction: MoveDirection,
    },

    /// Print tasks in display order
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Verify every chain invariant
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr, so list output stays clean)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = TaskListConfig::from_env().context("Invalid configuration")?;
    if let Some(db) = args.db {
        config = config.with_db_path(db);
    }

    let service = TaskListService::open(&config)
        .await
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
    let queue = MutationQueue::new(Arc::new(service), config.max_write_retries);

    run(&queue, args.command).await
}

async fn run(queue: &MutationQueue, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Add { text } => {
            let id = queue.append().await?;
            if text.is_some() {
                queue.edit(id, text).await?;
            }
            println!("Added task {}", id);
        }

        Command::Edit { id, text, clear } => {
            let id = TaskId::new(id);
            let text = if clear { None } else { text };
            match queue.edit(id, text).await? {
                EditOutcome::Applied => println!("Updated task {}", id),
                EditOutcome::Ignored => println!("Nothing to do for id 0"),
                EditOutcome::NotFound => anyhow::bail!("Task {} not found", id),
            }
        }

        Command::Delete { id } => {
            let id = TaskId::new(id);
            match queue.delete(id).await? {
                DeleteOutcome::Applied => println!("Deleted task {}", id),
                DeleteOutcome::Ignored => println!("Nothing to do for id 0"),
                DeleteOutcome::NotFound => anyhow::bail!("Task {} not found", id),
            }
        }

        Command::Move {
            selected,
            target,
            direction,
        } => {
            let selected = TaskId::new(selected);
            let target = TaskId::new(target);
            match queue.move_task(selected, target, direction).await? {
                MoveOutcome::Applied { .. } => {
                    println!("Moved task {} {} task {}", selected, direction, target)
                }
                MoveOutcome::AlreadyInPlace => println!("Task {} is already there", selected),
                MoveOutcome::Ignored => println!("Nothing to do for id 0"),
                MoveOutcome::NotFound { id } => anyhow::bail!("Task {} not found", id),
            }
        }

        Command::List { json } => {
            let tasks = queue.service().fetch_ordered().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                print_tasks(&tasks);
            }
        }

        Command::Check => {
            let summary = queue.service().verify_integrity().await?;
            match (summary.head, summary.tail) {
                (Some(head), Some(tail)) => println!(
                    "OK: {} task(s), head {}, tail {}",
                    summary.len, head, tail
                ),
                _ => println!("OK: empty list"),
            }
        }
    }

    Ok(())
}

fn print_tasks(tasks: &[TaskRecord]) {
    println!("Tasks ({})", tasks.len());
    for task in tasks {
        match &task.text {
            Some(text) => println!("{:>6}  {}", task.id.get(), text),
            None => println!("{:>6}  (no text)", task.id.get()),
        }
    }
}
