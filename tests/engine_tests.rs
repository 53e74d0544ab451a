//! Scenario tests for the prioritization and batching engine.

use gtd_triage::engine::PriorityBatchEngine;
use gtd_triage::engine::scoring::DAY_MS;
use gtd_triage::types::{BatchPriority, Priority, Task, TaskStatus};

const NOW: i64 = 1_760_000_000_000;
const HOUR_MS: i64 = 60 * 60 * 1000;

fn engine() -> PriorityBatchEngine {
    PriorityBatchEngine::new()
}

fn grouped(id: &str, context: &str, category: &str, duration: u32, priority: Priority) -> Task {
    let mut task = Task::new(id, format!("Task {}", id), duration);
    task.context = context.to_string();
    task.category = category.to_string();
    task.priority = priority;
    task
}

mod prioritize_scenarios {
    use super::*;

    #[test]
    fn completed_tasks_are_never_reported() {
        let mut tasks = Vec::new();
        for (i, priority) in [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent]
            .into_iter()
            .enumerate()
        {
            let mut t = Task::new(format!("done-{}", i), "Finished", 5);
            t.status = TaskStatus::Completed;
            t.priority = priority;
            t.deadline = Some(NOW - DAY_MS);
            t.urgent = true;
            tasks.push(t);
        }

        let result = engine().prioritize(&tasks, NOW);
        assert!(result.changes.is_empty());
        assert_eq!(result.scored, 0);
    }

    #[test]
    fn three_reference_scores() {
        let plain = Task::new("plain", "Read a book", 60);

        let mut hot = Task::new("hot", "Renew passport", 10);
        hot.deadline = Some(NOW + 12 * HOUR_MS);
        hot.urgent = true;
        hot.important = true;

        let mut root = Task::new("root", "Draft budget", 20);
        root.deadline = Some(NOW + 10 * DAY_MS);
        root.important = true;

        let mut tasks = vec![plain, hot, root];
        for id in ["x", "y", "z"] {
            let mut t = Task::new(id, id, 60);
            t.priority = Priority::Low;
            t.dependencies = vec!["root".to_string()];
            tasks.push(t);
        }

        let e = engine();
        let expect = [("plain", 0, Priority::Low), ("hot", 80, Priority::Urgent), ("root", 45, Priority::Medium)];
        for (id, score, tier) in expect {
            let task = tasks.iter().find(|t| t.id == id).unwrap();
            let breakdown = e.score(task, &tasks, NOW);
            assert_eq!(breakdown.total(), score, "score for {}", id);
            assert_eq!(breakdown.tier(), tier, "tier for {}", id);
        }

        // plain and hot change from the default medium; root stays medium.
        let result = e.prioritize(&tasks, NOW);
        let changed: Vec<&str> = result.changes.iter().map(|c| c.task_id.as_str()).collect();
        assert_eq!(changed, vec!["plain", "hot"]);
    }

    #[test]
    fn second_pass_after_applying_is_empty() {
        let mut tasks = vec![
            Task::new("a", "Quick email", 5),
            Task::new("b", "Quarterly review", 120),
        ];
        tasks[0].urgent = true;
        tasks[0].deadline = Some(NOW + 2 * DAY_MS);
        tasks[1].dependencies = vec!["a".to_string()];

        let first = engine().prioritize(&tasks, NOW);
        for change in &first.changes {
            let task = tasks.iter_mut().find(|t| t.id == change.task_id).unwrap();
            task.priority = change.to;
        }

        assert!(engine().prioritize(&tasks, NOW).changes.is_empty());
    }
}

mod batch_scenarios {
    use super::*;

    #[test]
    fn office_calls_are_batched_together() {
        let tasks = vec![
            grouped("c1", "@office", "calls", 10, Priority::Low),
            grouped("other", "@errands", "shopping", 45, Priority::Low),
            grouped("c2", "@office", "calls", 15, Priority::Low),
        ];

        let plan = engine().auto_batch(&tasks, &[]);
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(plan.batches[0].tasks, vec!["c1", "c2"]);
        assert_eq!(plan.batches[0].total_duration, 25);
        assert_eq!(plan.unbatched, vec!["other"]);
    }

    #[test]
    fn single_member_group_is_not_batched() {
        let tasks = vec![grouped("solo", "@office", "calls", 10, Priority::Low)];
        let plan = engine().auto_batch(&tasks, &[]);
        assert!(plan.batches.is_empty());
    }

    #[test]
    fn urgent_and_medium_members_give_high_batch() {
        let tasks = vec![
            grouped("a", "@office", "calls", 10, Priority::Urgent),
            grouped("b", "@office", "calls", 10, Priority::Medium),
        ];
        let plan = engine().auto_batch(&tasks, &[]);
        assert_eq!(plan.batches[0].priority, BatchPriority::High);
    }

    #[test]
    fn home_cleaning() {
        let tasks = vec![
            grouped("a", "@home", "cleaning", 15, Priority::Low),
            grouped("b", "@home", "cleaning", 20, Priority::Medium),
        ];

        let plan = engine().auto_batch(&tasks, &[]);
        assert_eq!(plan.batches.len(), 1);
        let batch = &plan.batches[0];
        assert_eq!(batch.name, "@home - cleaning");
        assert_eq!(batch.tasks, vec!["a", "b"]);
        assert_eq!(batch.total_duration, 35);
        assert_eq!(batch.priority, BatchPriority::Medium);
    }

    #[test]
    fn invalid_records_are_skipped_not_fatal() {
        let tasks = vec![
            grouped("a", "@home", "cleaning", 15, Priority::Low),
            grouped("zero", "@home", "cleaning", 0, Priority::Low),
            grouped("b", "@home", "cleaning", 20, Priority::Low),
        ];

        let plan = engine().auto_batch(&tasks, &[]);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.batches[0].tasks, vec!["a", "b"]);
    }
}
