//! Priority scoring.
//!
//! A task's score is the sum of four capped factors: deadline proximity,
//! the Eisenhower quadrant, dependency fan-in and estimated duration. The
//! total maps onto a [`Priority`] tier via [`Priority::from_score`].

use super::open_valid_tasks;
use crate::error::EngineError;
use crate::types::{Priority, PriorityChange, Task};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Points per dependent task, and the cap on the fan-in factor.
const POINTS_PER_DEPENDENT: u32 = 5;
const MAX_DEPENDENT_POINTS: u32 = 20;

/// Per-factor score for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Whole days until the deadline, rounded up. `None` without a deadline.
    pub days_until_deadline: Option<i64>,
    pub deadline: u32,
    pub eisenhower: u32,
    pub dependent_count: usize,
    pub dependents: u32,
    pub duration: u32,
}

impl ScoreBreakdown {
    /// Score `task`, counting dependents across the whole of `tasks`.
    pub fn compute(task: &Task, tasks: &[Task], now_ms: i64) -> Self {
        let dependent_count = tasks.iter().filter(|t| t.depends_on(&task.id)).count();
        Self::with_dependents(task, dependent_count, now_ms)
    }

    fn with_dependents(task: &Task, dependent_count: usize, now_ms: i64) -> Self {
        let days_until_deadline = task.deadline.map(|d| days_until(d, now_ms));
        Self {
            days_until_deadline,
            deadline: days_until_deadline.map_or(0, deadline_points),
            eisenhower: eisenhower_points(task.urgent, task.important),
            dependent_count,
            dependents: dependent_points(dependent_count),
            duration: duration_points(task.estimated_duration),
        }
    }

    pub fn total(&self) -> u32 {
        self.deadline + self.eisenhower + self.dependents + self.duration
    }

    pub fn tier(&self) -> Priority {
        Priority::from_score(self.total())
    }
}

/// Result of a prioritization pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Prioritization {
    /// Tasks whose computed tier differs from their stored priority.
    pub changes: Vec<PriorityChange>,
    /// Number of open tasks that were scored.
    pub scored: usize,
    /// Records skipped as invalid.
    pub skipped: Vec<EngineError>,
}

/// Days until `deadline_ms`, rounded up. Overdue deadlines give zero or less.
pub fn days_until(deadline_ms: i64, now_ms: i64) -> i64 {
    // Widened so timestamps at the edges of i64 cannot overflow.
    let delta = i128::from(deadline_ms) - i128::from(now_ms);
    let days = -(-delta).div_euclid(i128::from(DAY_MS));
    i64::try_from(days).unwrap_or(if days < 0 { i64::MIN } else { i64::MAX })
}

pub fn deadline_points(days: i64) -> u32 {
    match days {
        d if d <= 1 => 40,
        d if d <= 3 => 30,
        d if d <= 7 => 20,
        d if d <= 14 => 10,
        _ => 0,
    }
}

/// Highest applicable Eisenhower quadrant only.
pub fn eisenhower_points(urgent: bool, important: bool) -> u32 {
    match (urgent, important) {
        (true, true) => 30,
        (true, false) => 20,
        (false, true) => 15,
        (false, false) => 0,
    }
}

pub fn dependent_points(count: usize) -> u32 {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    count
        .saturating_mul(POINTS_PER_DEPENDENT)
        .min(MAX_DEPENDENT_POINTS)
}

pub fn duration_points(minutes: u32) -> u32 {
    if minutes <= 15 {
        10
    } else if minutes <= 30 {
        5
    } else {
        0
    }
}

/// Count, for each task id, how many tasks in the collection depend on it.
fn dependent_counts(tasks: &[Task]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        let unique: HashSet<&str> = task.dependencies.iter().map(String::as_str).collect();
        for dep in unique {
            *counts.entry(dep).or_default() += 1;
        }
    }
    counts
}

/// Score every open task and report those whose tier changed.
pub fn prioritize(tasks: &[Task], now_ms: i64) -> Prioritization {
    let counts = dependent_counts(tasks);
    let (open, skipped) = open_valid_tasks(tasks);

    let mut changes = Vec::new();
    for task in &open {
        let fan_in = counts.get(task.id.as_str()).copied().unwrap_or(0);
        let breakdown = ScoreBreakdown::with_dependents(task, fan_in, now_ms);
        let tier = breakdown.tier();

        debug!(
            task_id = %task.id,
            score = breakdown.total(),
            current = %task.priority,
            computed = %tier,
            "Scored task"
        );

        if tier != task.priority {
            changes.push(PriorityChange {
                task_id: task.id.clone(),
                from: task.priority,
                to: tier,
                score: breakdown.total(),
            });
        }
    }

    Prioritization {
        changes,
        scored: open.len(),
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::TaskStatus;

    const NOW: i64 = 1_760_000_000_000;
    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn task(id: &str, duration: u32) -> Task {
        Task::new(id, format!("Task {}", id), duration)
    }

    #[test]
    fn days_until_rounds_up() {
        assert_eq!(days_until(NOW + 12 * HOUR_MS, NOW), 1);
        assert_eq!(days_until(NOW + DAY_MS, NOW), 1);
        assert_eq!(days_until(NOW + DAY_MS + 1, NOW), 2);
        assert_eq!(days_until(NOW + 10 * DAY_MS, NOW), 10);
        assert_eq!(days_until(NOW - 12 * HOUR_MS, NOW), 0);
        assert_eq!(days_until(NOW - 3 * DAY_MS, NOW), -3);
    }

    #[test]
    fn extreme_deadlines_do_not_overflow() {
        assert!(days_until(i64::MIN, NOW) < 0);
        assert!(days_until(i64::MAX, i64::MIN) > 0);

        let mut t = task("ancient", 60);
        t.deadline = Some(i64::MIN);
        t.priority = Priority::Low;
        let breakdown = ScoreBreakdown::compute(&t, std::slice::from_ref(&t), NOW);
        assert_eq!(breakdown.deadline, 40);

        let mut far = task("far", 60);
        far.deadline = Some(i64::MAX);
        let result = prioritize(&[t, far], NOW);
        assert_eq!(result.scored, 2);
        assert_eq!(result.changes[0].score, 40);
        assert_eq!(result.changes[1].score, 0);
    }

    #[test]
    fn deadline_buckets() {
        assert_eq!(deadline_points(-5), 40);
        assert_eq!(deadline_points(1), 40);
        assert_eq!(deadline_points(2), 30);
        assert_eq!(deadline_points(3), 30);
        assert_eq!(deadline_points(7), 20);
        assert_eq!(deadline_points(14), 10);
        assert_eq!(deadline_points(15), 0);
    }

    #[test]
    fn eisenhower_takes_highest_quadrant_only() {
        assert_eq!(eisenhower_points(true, true), 30);
        assert_eq!(eisenhower_points(true, false), 20);
        assert_eq!(eisenhower_points(false, true), 15);
        assert_eq!(eisenhower_points(false, false), 0);
    }

    #[test]
    fn fan_in_is_capped() {
        assert_eq!(dependent_points(0), 0);
        assert_eq!(dependent_points(3), 15);
        assert_eq!(dependent_points(4), 20);
        assert_eq!(dependent_points(40), 20);
    }

    #[test]
    fn duration_buckets() {
        assert_eq!(duration_points(10), 10);
        assert_eq!(duration_points(15), 10);
        assert_eq!(duration_points(16), 5);
        assert_eq!(duration_points(30), 5);
        assert_eq!(duration_points(31), 0);
    }

    #[test]
    fn plain_long_task_scores_zero() {
        let t = task("a", 60);
        let breakdown = ScoreBreakdown::compute(&t, std::slice::from_ref(&t), NOW);
        assert_eq!(breakdown.total(), 0);
        assert_eq!(breakdown.tier(), Priority::Low);
    }

    #[test]
    fn due_soon_urgent_important_short_task_is_urgent() {
        let mut t = task("a", 10);
        t.deadline = Some(NOW + 12 * HOUR_MS);
        t.urgent = true;
        t.important = true;

        let breakdown = ScoreBreakdown::compute(&t, std::slice::from_ref(&t), NOW);
        assert_eq!(breakdown.deadline, 40);
        assert_eq!(breakdown.eisenhower, 30);
        assert_eq!(breakdown.dependents, 0);
        assert_eq!(breakdown.duration, 10);
        assert_eq!(breakdown.total(), 80);
        assert_eq!(breakdown.tier(), Priority::Urgent);
    }

    #[test]
    fn important_task_with_dependents_is_medium() {
        let mut t = task("root", 20);
        t.deadline = Some(NOW + 10 * DAY_MS);
        t.important = true;

        let mut tasks = vec![t];
        for id in ["x", "y", "z"] {
            let mut dependent = task(id, 60);
            dependent.dependencies = vec!["root".to_string()];
            tasks.push(dependent);
        }

        let breakdown = ScoreBreakdown::compute(&tasks[0], &tasks, NOW);
        assert_eq!(breakdown.dependent_count, 3);
        assert_eq!(breakdown.total(), 10 + 15 + 15 + 5);
        assert_eq!(breakdown.tier(), Priority::Medium);
    }

    #[test]
    fn completed_dependents_still_count() {
        let root = task("root", 60);
        let mut done = task("done", 60);
        done.status = TaskStatus::Completed;
        done.dependencies = vec!["root".to_string()];

        let tasks = vec![root, done];
        let breakdown = ScoreBreakdown::compute(&tasks[0], &tasks, NOW);
        assert_eq!(breakdown.dependent_count, 1);
    }

    #[test]
    fn duplicate_dependency_entries_count_once() {
        let root = task("root", 60);
        let mut dependent = task("d", 60);
        dependent.dependencies = vec!["root".to_string(), "root".to_string()];

        let tasks = vec![root, dependent];
        let counts = dependent_counts(&tasks);
        assert_eq!(counts.get("root"), Some(&1));
    }

    #[test]
    fn prioritize_omits_unchanged_tasks() {
        let mut already_low = task("a", 60);
        already_low.priority = Priority::Low;
        let mut needs_bump = task("b", 10);
        needs_bump.priority = Priority::Low;
        needs_bump.urgent = true;
        needs_bump.important = true;

        let result = prioritize(&[already_low, needs_bump], NOW);
        assert_eq!(result.scored, 2);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].task_id, "b");
        assert_eq!(result.changes[0].from, Priority::Low);
        assert_eq!(result.changes[0].to, Priority::Medium);
        assert_eq!(result.changes[0].score, 40);
    }

    #[test]
    fn prioritize_never_touches_completed_tasks() {
        let mut done = task("done", 5);
        done.status = TaskStatus::Completed;
        done.priority = Priority::Low;
        done.urgent = true;
        done.important = true;
        done.deadline = Some(NOW);

        let result = prioritize(&[done], NOW);
        assert!(result.changes.is_empty());
        assert_eq!(result.scored, 0);
    }

    #[test]
    fn prioritize_skips_invalid_records() {
        let broken = task("broken", 0);
        let mut fine = task("fine", 60);
        fine.priority = Priority::Urgent;

        let result = prioritize(&[broken, fine], NOW);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].code, ErrorCode::InvalidTaskRecord);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].task_id, "fine");
        assert_eq!(result.changes[0].to, Priority::Low);
    }

    #[test]
    fn prioritize_is_idempotent_once_applied() {
        let mut a = task("a", 10);
        a.deadline = Some(NOW + 2 * DAY_MS);
        a.urgent = true;
        let mut b = task("b", 45);
        b.dependencies = vec!["a".to_string()];
        b.important = true;

        let mut tasks = vec![a, b];
        let first = prioritize(&tasks, NOW);
        assert!(!first.changes.is_empty());

        for change in &first.changes {
            if let Some(t) = tasks.iter_mut().find(|t| t.id == change.task_id) {
                t.priority = change.to;
            }
        }

        let second = prioritize(&tasks, NOW);
        assert!(second.changes.is_empty());
    }
}
