//! Prioritization, batching and dependency-suggestion heuristics.
//!
//! Everything here is pure: functions take a task snapshot and return
//! computed deltas. Persisting those deltas is the caller's job (see
//! [`crate::service::TaskService`]).

pub mod batching;
pub mod scoring;
pub mod suggest;

pub use batching::BatchPlan;
pub use scoring::{Prioritization, ScoreBreakdown};
pub use suggest::{DependencySuggester, SuggestionRule};

use crate::error::EngineError;
use crate::types::{Task, TaskBatch};
use tracing::warn;

/// Scores and groups tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityBatchEngine;

impl PriorityBatchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute new priorities for every open task, returning only changes.
    pub fn prioritize(&self, tasks: &[Task], now_ms: i64) -> Prioritization {
        scoring::prioritize(tasks, now_ms)
    }

    /// Score one task against the collection it lives in.
    pub fn score(&self, task: &Task, tasks: &[Task], now_ms: i64) -> ScoreBreakdown {
        ScoreBreakdown::compute(task, tasks, now_ms)
    }

    /// Group open, unbatched tasks into new batches.
    pub fn auto_batch(&self, tasks: &[Task], existing_batches: &[TaskBatch]) -> BatchPlan {
        batching::auto_batch(tasks, existing_batches)
    }
}

/// Check that a record carries the fields scoring and batching rely on.
pub fn validate_task(task: &Task) -> Result<(), EngineError> {
    if task.id.trim().is_empty() {
        return Err(EngineError::invalid_task(&task.id, "id"));
    }
    if task.estimated_duration == 0 {
        return Err(EngineError::invalid_task(&task.id, "estimated_duration"));
    }
    Ok(())
}

/// Split a snapshot into valid open tasks and skipped records.
///
/// Completed tasks are dropped silently; invalid records are reported.
pub(crate) fn open_valid_tasks(tasks: &[Task]) -> (Vec<&Task>, Vec<EngineError>) {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for task in tasks.iter().filter(|t| t.is_open()) {
        match validate_task(task) {
            Ok(()) => valid.push(task),
            Err(err) => {
                warn!(task_id = %task.id, field = ?err.field, "Skipping invalid task record");
                skipped.push(err);
            }
        }
    }

    (valid, skipped)
}
