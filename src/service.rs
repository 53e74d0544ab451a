//! Task service: runs the engine against a repository and persists results.
//!
//! The service keeps a snapshot of the task collection and patches it after
//! each successful write instead of reloading everything. Call
//! [`TaskService::invalidate`] after writes made outside the service.

use crate::config::Config;
use crate::engine::{DependencySuggester, PriorityBatchEngine, ScoreBreakdown};
use crate::error::EngineError;
use crate::repository::{TaskRepository, commit_batch_sequential};
use crate::types::{NewBatch, PriorityChange, Task, TaskBatch};
use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of a prioritization run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrioritizeReport {
    pub dry_run: bool,
    pub scored: usize,
    /// Every computed change, applied or not.
    pub changes: Vec<PriorityChange>,
    /// Ids whose new priority was persisted.
    pub applied: Vec<String>,
    pub failures: Vec<EngineError>,
    pub skipped: Vec<EngineError>,
}

/// Outcome of an auto-batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub dry_run: bool,
    /// Batches computed by the engine.
    pub proposed: Vec<NewBatch>,
    /// Batches that were persisted.
    pub created: Vec<TaskBatch>,
    pub unbatched: Vec<String>,
    pub dangling: Vec<String>,
    pub failures: Vec<EngineError>,
    pub skipped: Vec<EngineError>,
}

impl BatchReport {
    /// Batches whose members were not all linked back to them.
    pub fn partial_batches(&self) -> Vec<&TaskBatch> {
        self.created
            .iter()
            .filter(|b| {
                self.failures.iter().any(|f| {
                    f.task_id
                        .as_ref()
                        .is_some_and(|id| b.tasks.contains(id))
                })
            })
            .collect()
    }
}

/// Runs prioritization, batching and suggestions over a repository.
pub struct TaskService<R> {
    repo: R,
    engine: PriorityBatchEngine,
    suggester: DependencySuggester,
    atomic_batches: bool,
    snapshot: Option<Vec<Task>>,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            engine: PriorityBatchEngine::new(),
            suggester: DependencySuggester::default(),
            atomic_batches: true,
            snapshot: None,
        }
    }

    /// Build a service with suggestion rules and batching mode from config.
    pub fn from_config(repo: R, config: &Config) -> Self {
        Self::new(repo)
            .with_suggester(
                DependencySuggester::new(config.suggestions.rules.clone())
                    .with_dedup(config.suggestions.dedup),
            )
            .with_atomic_batches(config.batching.atomic)
    }

    pub fn with_suggester(mut self, suggester: DependencySuggester) -> Self {
        self.suggester = suggester;
        self
    }

    /// Choose between [`TaskRepository::commit_batch`] and the sequential
    /// best-effort path when persisting batches.
    pub fn with_atomic_batches(mut self, atomic: bool) -> Self {
        self.atomic_batches = atomic;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Drop the cached snapshot; the next operation reloads it.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    /// Score every open task and persist changed priorities one at a time.
    ///
    /// A failed write is recorded and the run moves on to the next task.
    pub fn prioritize(&mut self, now_ms: i64, dry_run: bool) -> Result<PrioritizeReport> {
        let tasks = load_snapshot(&self.repo, &mut self.snapshot)?;
        let result = self.engine.prioritize(tasks, now_ms);

        let mut report = PrioritizeReport {
            dry_run,
            scored: result.scored,
            changes: result.changes,
            skipped: result.skipped,
            ..Default::default()
        };

        if dry_run {
            return Ok(report);
        }

        for change in &report.changes {
            match self.repo.apply_priority(&change.task_id, change.to) {
                Ok(()) => {
                    debug!(task_id = %change.task_id, from = %change.from, to = %change.to, "Applied priority");
                    self.patch_task(&change.task_id, |t| t.priority = change.to);
                    report.applied.push(change.task_id.clone());
                }
                Err(e) => {
                    warn!(task_id = %change.task_id, error = %e, "Failed to apply priority");
                    report.failures.push(
                        EngineError::persistence("apply_priority", e)
                            .with_task(change.task_id.as_str()),
                    );
                }
            }
        }

        info!(
            scored = report.scored,
            changed = report.changes.len(),
            applied = report.applied.len(),
            failed = report.failures.len(),
            "Prioritization complete"
        );
        Ok(report)
    }

    /// Form batches from open, unbatched tasks and persist them.
    ///
    /// Each batch is committed independently; a failure on one batch does not
    /// stop the others.
    pub fn auto_batch(&mut self, dry_run: bool) -> Result<BatchReport> {
        let existing = self.repo.list_batches()?;
        let tasks = load_snapshot(&self.repo, &mut self.snapshot)?;
        let plan = self.engine.auto_batch(tasks, &existing);

        let mut report = BatchReport {
            dry_run,
            proposed: plan.batches,
            unbatched: plan.unbatched,
            dangling: plan.dangling,
            skipped: plan.skipped,
            ..Default::default()
        };

        if dry_run {
            return Ok(report);
        }

        for batch in &report.proposed {
            let commit = if self.atomic_batches {
                self.repo.commit_batch(batch)
            } else {
                commit_batch_sequential(&self.repo, batch)
            };

            match commit {
                Ok(commit) => {
                    for task_id in &commit.assigned {
                        let batch_id = commit.batch.id.clone();
                        self.patch_task(task_id, |t| t.batch_id = Some(batch_id));
                    }
                    report.failures.extend(commit.failures);
                    report.created.push(commit.batch);
                }
                Err(e) => {
                    warn!(name = %batch.name, error = %e, "Failed to create batch");
                    report.failures.push(
                        EngineError::persistence("create_batch", e).with_details(batch.name.as_str()),
                    );
                }
            }
        }

        info!(
            proposed = report.proposed.len(),
            created = report.created.len(),
            failed = report.failures.len(),
            "Auto-batching complete"
        );
        Ok(report)
    }

    /// Suggest dependencies for a task from its title.
    pub fn suggest_dependencies(&mut self, task_id: &str) -> Result<Vec<String>> {
        let tasks = load_snapshot(&self.repo, &mut self.snapshot)?;
        Ok(self.suggester.suggest(task_id, tasks)?)
    }

    /// Per-factor score for one task.
    pub fn explain(&mut self, task_id: &str, now_ms: i64) -> Result<ScoreBreakdown> {
        let tasks = load_snapshot(&self.repo, &mut self.snapshot)?;
        let task = tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| EngineError::task_not_found(task_id))?;
        Ok(self.engine.score(task, tasks, now_ms))
    }

    fn patch_task(&mut self, task_id: &str, f: impl FnOnce(&mut Task)) {
        if let Some(task) = self
            .snapshot
            .as_mut()
            .and_then(|tasks| tasks.iter_mut().find(|t| t.id == task_id))
        {
            f(task);
        }
    }
}

fn load_snapshot<'a, R: TaskRepository>(
    repo: &R,
    cache: &'a mut Option<Vec<Task>>,
) -> Result<&'a mut Vec<Task>> {
    let tasks = match cache.take() {
        Some(tasks) => tasks,
        None => {
            let tasks = repo.list_tasks()?;
            debug!(count = tasks.len(), "Loaded task snapshot");
            tasks
        }
    };
    Ok(cache.insert(tasks))
}
