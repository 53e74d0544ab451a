//! Output formatting utilities for markdown and JSON.

use crate::engine::ScoreBreakdown;
use crate::error::EngineError;
use crate::service::{BatchReport, PrioritizeReport};
use crate::types::{Task, TaskBatch, TaskStatus};
use chrono::{DateTime, Utc};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

fn format_deadline(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **priority**: {}\n", task.priority));
    md.push_str(&format!("- **duration**: {} min\n", task.estimated_duration));

    if let Some(deadline) = task.deadline {
        md.push_str(&format!("- **deadline**: {}\n", format_deadline(deadline)));
    }

    let mut flags = Vec::new();
    if task.urgent {
        flags.push("urgent");
    }
    if task.important {
        flags.push("important");
    }
    if !flags.is_empty() {
        md.push_str(&format!("- **flags**: {}\n", flags.join(", ")));
    }

    if !task.context.is_empty() || !task.category.is_empty() {
        md.push_str(&format!("- **context**: {} / {}\n", task.context, task.category));
    }

    if !task.dependencies.is_empty() {
        let deps: Vec<String> = task.dependencies.iter().map(|id| format!("`{}`", id)).collect();
        md.push_str(&format!("- **depends_on**: {}\n", deps.join(", ")));
    }

    if let Some(ref batch_id) = task.batch_id {
        md.push_str(&format!("- **batch**: `{}`\n", batch_id));
    }

    md
}

/// Format a task as a single list line.
pub fn format_task_short(task: &Task) -> String {
    let mut line = format!("- [{}] `{}` {}", task.priority, task.id, task.title);
    if !task.context.is_empty() {
        line.push_str(&format!(" ({})", task.context));
    }
    line.push('\n');
    line
}

/// Format a list of tasks grouped by status.
pub fn format_tasks_markdown(tasks: &[Task]) -> String {
    let mut md = format!("# Tasks ({})\n\n", tasks.len());

    let order = [
        TaskStatus::Inbox,
        TaskStatus::NextAction,
        TaskStatus::WaitingFor,
        TaskStatus::Project,
        TaskStatus::SomedayMaybe,
        TaskStatus::Completed,
    ];
    for status in order {
        let group: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
        if group.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", status));
        for task in group {
            md.push_str(&format_task_short(task));
        }
        md.push('\n');
    }

    md
}

pub fn format_batch_markdown(batch: &TaskBatch) -> String {
    let ids: Vec<String> = batch.tasks.iter().map(|id| format!("`{}`", id)).collect();
    format!(
        "- **{}** `{}` [{}] {} min: {}\n",
        batch.name,
        batch.id,
        batch.priority,
        batch.total_duration,
        ids.join(", ")
    )
}

pub fn format_batches_markdown(batches: &[TaskBatch]) -> String {
    let mut md = format!("# Batches ({})\n\n", batches.len());
    for batch in batches {
        md.push_str(&format_batch_markdown(batch));
    }
    md
}

fn format_errors(title: &str, errors: &[EngineError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut md = format!("\n## {}\n\n", title);
    for err in errors {
        md.push_str(&format!("- {}\n", err.message));
    }
    md
}

pub fn format_prioritize_report(report: &PrioritizeReport) -> String {
    let mut md = String::from("# Prioritization");
    if report.dry_run {
        md.push_str(" (dry run)");
    }
    md.push_str(&format!(
        "\n\nScored {} open task(s); {} change(s).\n\n",
        report.scored,
        report.changes.len()
    ));

    for change in &report.changes {
        md.push_str(&format!(
            "- `{}` {} -> {} (score {})\n",
            change.task_id, change.from, change.to, change.score
        ));
    }

    md.push_str(&format_errors("Failed writes", &report.failures));
    md.push_str(&format_errors("Skipped records", &report.skipped));
    md
}

pub fn format_batch_report(report: &BatchReport) -> String {
    let mut md = String::from("# Auto-batching");
    if report.dry_run {
        md.push_str(" (dry run)");
    }
    md.push_str("\n\n");

    if report.dry_run {
        for batch in &report.proposed {
            md.push_str(&format!(
                "- **{}** [{}] {} min: {}\n",
                batch.name,
                batch.priority,
                batch.total_duration,
                batch.tasks.join(", ")
            ));
        }
    } else {
        for batch in &report.created {
            md.push_str(&format_batch_markdown(batch));
        }
    }
    if report.proposed.is_empty() {
        md.push_str("No batches formed.\n");
    }

    if !report.dangling.is_empty() {
        md.push_str(&format!(
            "\nTasks pointing at missing batches: {}\n",
            report.dangling.join(", ")
        ));
    }

    md.push_str(&format_errors("Failed writes", &report.failures));
    md.push_str(&format_errors("Skipped records", &report.skipped));
    md
}

pub fn format_breakdown_markdown(task: &Task, breakdown: &ScoreBreakdown) -> String {
    let mut md = format!("## Score: {} (`{}`)\n\n", task.title, task.id);
    let days = breakdown
        .days_until_deadline
        .map(|d| format!("{} day(s)", d))
        .unwrap_or_else(|| "none".to_string());
    md.push_str(&format!("- **deadline** ({}): +{}\n", days, breakdown.deadline));
    md.push_str(&format!("- **eisenhower**: +{}\n", breakdown.eisenhower));
    md.push_str(&format!(
        "- **dependents** ({}): +{}\n",
        breakdown.dependent_count, breakdown.dependents
    ));
    md.push_str(&format!("- **duration**: +{}\n", breakdown.duration));
    md.push_str(&format!(
        "- **total**: {} -> {} (currently {})\n",
        breakdown.total(),
        breakdown.tier(),
        task.priority
    ));
    md
}
