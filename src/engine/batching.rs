//! Auto-batching of similar tasks.
//!
//! Open tasks without a batch are grouped by the exact `(context, category)`
//! pair. Any group with two or more members becomes a [`NewBatch`].
//!
//! Running this twice before member tasks receive their `batch_id` proposes
//! the same batches again. Callers that need a single batch per group must
//! commit the batch and its member assignments together.

use super::open_valid_tasks;
use crate::error::EngineError;
use crate::types::{BatchPriority, NewBatch, Priority, Task, TaskBatch};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Minimum number of tasks that form a batch.
pub const MIN_BATCH_SIZE: usize = 2;

/// Batches proposed by one auto-batch pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchPlan {
    pub batches: Vec<NewBatch>,
    /// Ids of candidate tasks left unbatched (singleton groups).
    pub unbatched: Vec<String>,
    /// Tasks whose `batch_id` points at a batch that does not exist.
    pub dangling: Vec<String>,
    /// Records skipped as invalid.
    pub skipped: Vec<EngineError>,
}

/// Highest member priority, with urgent collapsed to high.
pub fn batch_priority<'a, I>(priorities: I) -> BatchPriority
where
    I: IntoIterator<Item = &'a Priority>,
{
    priorities
        .into_iter()
        .max()
        .copied()
        .map(BatchPriority::from)
        .unwrap_or_default()
}

/// Group open, unbatched tasks into new batches.
pub fn auto_batch(tasks: &[Task], existing_batches: &[TaskBatch]) -> BatchPlan {
    let known: HashSet<&str> = existing_batches.iter().map(|b| b.id.as_str()).collect();
    let (open, skipped) = open_valid_tasks(tasks);

    let mut dangling = Vec::new();
    // Group order follows the first member's position in the collection.
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut groups: HashMap<(&str, &str), Vec<&Task>> = HashMap::new();

    for task in open {
        if let Some(ref batch_id) = task.batch_id {
            if !known.contains(batch_id.as_str()) {
                warn!(task_id = %task.id, batch_id = %batch_id, "Task references unknown batch");
                dangling.push(task.id.clone());
            }
            continue;
        }

        let key = (task.context.as_str(), task.category.as_str());
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(task);
    }

    let mut batches = Vec::new();
    let mut unbatched = Vec::new();

    for key in order {
        let Some(members) = groups.remove(&key) else {
            continue;
        };

        if members.len() < MIN_BATCH_SIZE {
            unbatched.extend(members.iter().map(|t| t.id.clone()));
            continue;
        }

        let first = members[0];
        let batch = NewBatch {
            name: format!("{} - {}", first.context, first.category),
            tasks: members.iter().map(|t| t.id.clone()).collect(),
            total_duration: members.iter().map(|t| t.estimated_duration).sum(),
            context: first.context.clone(),
            priority: batch_priority(members.iter().map(|t| &t.priority)),
        };

        debug!(
            name = %batch.name,
            size = batch.tasks.len(),
            total_duration = batch.total_duration,
            priority = %batch.priority,
            "Proposed batch"
        );
        batches.push(batch);
    }

    BatchPlan {
        batches,
        unbatched,
        dangling,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    fn task(id: &str, context: &str, category: &str, duration: u32, priority: Priority) -> Task {
        let mut t = Task::new(id, format!("Task {}", id), duration);
        t.context = context.to_string();
        t.category = category.to_string();
        t.priority = priority;
        t
    }

    #[test]
    fn groups_matching_tasks_and_leaves_the_rest() {
        let tasks = vec![
            task("a", "@office", "calls", 10, Priority::Low),
            task("b", "@home", "errands", 30, Priority::Low),
            task("c", "@office", "calls", 25, Priority::Medium),
        ];

        let plan = auto_batch(&tasks, &[]);
        assert_eq!(plan.batches.len(), 1);
        let batch = &plan.batches[0];
        assert_eq!(batch.tasks, vec!["a", "c"]);
        assert_eq!(batch.total_duration, 35);
        assert_eq!(batch.context, "@office");
        assert_eq!(plan.unbatched, vec!["b"]);
    }

    #[test]
    fn home_cleaning_scenario() {
        let tasks = vec![
            task("a", "@home", "cleaning", 15, Priority::Low),
            task("b", "@home", "cleaning", 20, Priority::Medium),
        ];

        let plan = auto_batch(&tasks, &[]);
        assert_eq!(
            plan.batches,
            vec![NewBatch {
                name: "@home - cleaning".to_string(),
                tasks: vec!["a".to_string(), "b".to_string()],
                total_duration: 35,
                context: "@home".to_string(),
                priority: BatchPriority::Medium,
            }]
        );
    }

    #[test]
    fn singleton_group_forms_no_batch() {
        let tasks = vec![task("solo", "@phone", "calls", 5, Priority::High)];
        let plan = auto_batch(&tasks, &[]);
        assert!(plan.batches.is_empty());
        assert_eq!(plan.unbatched, vec!["solo"]);
    }

    #[test]
    fn urgent_member_yields_high_batch() {
        let tasks = vec![
            task("a", "@office", "email", 5, Priority::Urgent),
            task("b", "@office", "email", 5, Priority::Medium),
        ];
        let plan = auto_batch(&tasks, &[]);
        assert_eq!(plan.batches[0].priority, BatchPriority::High);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let tasks = vec![
            task("a", "@Office", "calls", 5, Priority::Low),
            task("b", "@office", "calls", 5, Priority::Low),
        ];
        let plan = auto_batch(&tasks, &[]);
        assert!(plan.batches.is_empty());
    }

    #[test]
    fn skips_completed_and_batched_tasks() {
        let mut done = task("done", "@office", "calls", 5, Priority::Low);
        done.status = TaskStatus::Completed;
        let mut batched = task("batched", "@office", "calls", 5, Priority::Low);
        batched.batch_id = Some("existing".to_string());
        let open = task("open", "@office", "calls", 5, Priority::Low);

        let existing = TaskBatch {
            id: "existing".to_string(),
            name: "@office - calls".to_string(),
            tasks: vec!["batched".to_string()],
            total_duration: 5,
            context: "@office".to_string(),
            priority: BatchPriority::Low,
            created_at: 0,
        };

        let plan = auto_batch(&[done, batched, open], &[existing]);
        assert!(plan.batches.is_empty());
        assert!(plan.dangling.is_empty());
        assert_eq!(plan.unbatched, vec!["open"]);
    }

    #[test]
    fn reports_dangling_batch_references() {
        let mut orphan = task("orphan", "@office", "calls", 5, Priority::Low);
        orphan.batch_id = Some("gone".to_string());

        let plan = auto_batch(&[orphan], &[]);
        assert_eq!(plan.dangling, vec!["orphan"]);
        assert!(plan.unbatched.is_empty());
    }

    #[test]
    fn rerun_without_assignment_duplicates_batches() {
        let tasks = vec![
            task("a", "@office", "calls", 10, Priority::Low),
            task("b", "@office", "calls", 10, Priority::Low),
        ];

        let first = auto_batch(&tasks, &[]);
        let second = auto_batch(&tasks, &[]);
        assert_eq!(first.batches, second.batches);
        assert_eq!(second.batches.len(), 1);
    }

    #[test]
    fn empty_priority_list_defaults_to_low() {
        assert_eq!(batch_priority(std::iter::empty()), BatchPriority::Low);
    }
}
