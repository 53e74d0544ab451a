//! Bulk import of task lists from JSON.

use super::tasks::{get_task_internal, upsert_task};
use super::{Database, now_ms};
use crate::engine::validate_task;
use crate::error::EngineError;
use crate::types::Task;
use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Counts from an import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub replaced: usize,
    /// Tasks whose `batch_id` referenced a missing batch and was cleared.
    pub unlinked: Vec<String>,
    pub skipped: Vec<EngineError>,
}

/// Read a JSON array of tasks from a file.
pub fn read_tasks_file(path: &Path) -> Result<Vec<Task>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tasks from {}", path.display()))?;
    Ok(tasks)
}

impl Database {
    /// Insert or replace tasks in one transaction.
    ///
    /// Invalid records are skipped and reported. With `dry_run` nothing is
    /// written but the summary reflects what would happen.
    pub fn import_tasks(&self, tasks: &[Task], dry_run: bool) -> Result<ImportSummary> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut summary = ImportSummary::default();
            let now = now_ms();

            for task in tasks {
                if let Err(err) = validate_task(task) {
                    warn!(task_id = %task.id, error = %err, "Skipping invalid task on import");
                    summary.skipped.push(err);
                    continue;
                }

                let mut task = task.clone();
                if task.created_at == 0 {
                    task.created_at = now;
                }
                task.updated_at = now;

                if task.depends_on(&task.id) {
                    warn!(task_id = %task.id, "Dropping self-dependency on import");
                    let id = task.id.clone();
                    task.dependencies.retain(|d| *d != id);
                }

                if let Some(ref batch_id) = task.batch_id {
                    let exists = tx
                        .query_row(
                            "SELECT 1 FROM task_batches WHERE id = ?1",
                            params![batch_id],
                            |_| Ok(()),
                        )
                        .optional()?
                        .is_some();
                    if !exists {
                        warn!(task_id = %task.id, batch_id = %batch_id, "Clearing reference to unknown batch");
                        summary.unlinked.push(task.id.clone());
                        task.batch_id = None;
                    }
                }

                if get_task_internal(&tx, &task.id)?.is_some() {
                    summary.replaced += 1;
                } else {
                    summary.inserted += 1;
                }
                upsert_task(&tx, &task)?;
            }

            if dry_run {
                tx.rollback()?;
            } else {
                tx.commit()?;
            }

            info!(
                inserted = summary.inserted,
                replaced = summary.replaced,
                skipped = summary.skipped.len(),
                dry_run,
                "Imported tasks"
            );
            Ok(summary)
        })
    }
}
