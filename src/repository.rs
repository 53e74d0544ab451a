//! Persistence interface consumed by the task service.

use crate::error::EngineError;
use crate::types::{NewBatch, Priority, Task, TaskBatch};
use anyhow::Result;
use serde::Serialize;
use tracing::warn;

/// Storage for tasks and batches.
///
/// Every write is independent; implementations are not expected to roll back
/// earlier writes when a later one fails.
pub trait TaskRepository {
    /// All tasks, completed ones included.
    fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Tasks whose status is not completed.
    fn list_open_tasks(&self) -> Result<Vec<Task>> {
        Ok(self
            .list_tasks()?
            .into_iter()
            .filter(Task::is_open)
            .collect())
    }

    fn list_batches(&self) -> Result<Vec<TaskBatch>>;

    fn apply_priority(&self, task_id: &str, priority: Priority) -> Result<()>;

    /// Persist a batch and return it with its assigned id.
    fn create_batch(&self, batch: &NewBatch) -> Result<TaskBatch>;

    fn assign_task_to_batch(&self, task_id: &str, batch_id: &str) -> Result<()>;

    /// Create a batch and point its members at it as one logical unit.
    ///
    /// The default is best-effort: the batch is created, then each member is
    /// assigned in turn; failed assignments are collected and the rest
    /// proceed. Transactional stores should override this.
    fn commit_batch(&self, batch: &NewBatch) -> Result<BatchCommit> {
        commit_batch_sequential(self, batch)
    }
}

/// Outcome of committing one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchCommit {
    pub batch: TaskBatch,
    /// Member ids whose `batch_id` now points at the batch.
    pub assigned: Vec<String>,
    /// Member assignments that failed.
    pub failures: Vec<EngineError>,
}

/// Create the batch, then assign members one at a time.
///
/// A failure to create the batch is returned as an error; assignment
/// failures are collected in the returned [`BatchCommit`]. A batch whose
/// members did not all get assigned is left in place.
pub fn commit_batch_sequential<R>(repo: &R, batch: &NewBatch) -> Result<BatchCommit>
where
    R: TaskRepository + ?Sized,
{
    let created = repo.create_batch(batch)?;

    let mut assigned = Vec::new();
    let mut failures = Vec::new();
    for task_id in &created.tasks {
        match repo.assign_task_to_batch(task_id, &created.id) {
            Ok(()) => assigned.push(task_id.clone()),
            Err(e) => {
                warn!(task_id = %task_id, batch_id = %created.id, error = %e, "Failed to assign task to batch");
                failures.push(
                    EngineError::persistence("assign_task_to_batch", e).with_task(task_id.as_str()),
                );
            }
        }
    }

    Ok(BatchCommit {
        batch: created,
        assigned,
        failures,
    })
}
