//! Add subcommand for gtd-triage CLI

use crate::types::{Priority, Task, TaskStatus};
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate};
use clap::Args;

/// Arguments for the add subcommand
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Custom task ID (UUIDv7 generated if not provided)
    #[arg(long)]
    pub id: Option<String>,

    /// Estimated duration in minutes
    #[arg(short = 'm', long, default_value_t = 30)]
    pub duration: u32,

    /// Deadline: RFC 3339 timestamp or YYYY-MM-DD (end of day, UTC)
    #[arg(long)]
    pub deadline: Option<String>,

    /// Mark as urgent
    #[arg(long)]
    pub urgent: bool,

    /// Mark as important
    #[arg(long)]
    pub important: bool,

    /// Context, e.g. @office
    #[arg(long, default_value = "")]
    pub context: String,

    /// Category, e.g. calls
    #[arg(long, default_value = "")]
    pub category: String,

    /// GTD status
    #[arg(long, default_value = "inbox", value_parser = parse_status)]
    pub status: TaskStatus,

    /// Initial priority
    #[arg(long, default_value = "medium", value_parser = parse_priority)]
    pub priority: Priority,

    /// Ids of tasks this task depends on (comma-separated)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub depends_on: Vec<String>,
}

impl AddArgs {
    /// Build the task record to insert.
    pub fn to_task(&self) -> Result<Task> {
        let mut task = Task::new(
            self.id.clone().unwrap_or_default(),
            self.title.clone(),
            self.duration,
        );
        task.deadline = self.deadline.as_deref().map(parse_deadline).transpose()?;
        task.urgent = self.urgent;
        task.important = self.important;
        task.context = self.context.clone();
        task.category = self.category.clone();
        task.status = self.status;
        task.priority = self.priority;
        task.dependencies = self.depends_on.clone();
        Ok(task)
    }
}

pub fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_str(s).ok_or_else(|| {
        format!(
            "Invalid status '{}'. Valid options: inbox, next-action, waiting-for, project, someday-maybe, completed",
            s
        )
    })
}

pub fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::from_str(s).ok_or_else(|| {
        format!(
            "Invalid priority '{}'. Valid options: low, medium, high, urgent",
            s
        )
    })
}

/// Parse a deadline into epoch milliseconds.
pub fn parse_deadline(s: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid deadline '{}': expected RFC 3339 or YYYY-MM-DD", s))?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("Invalid deadline '{}'", s))?;
    Ok(end_of_day.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_deadline() {
        let ms = parse_deadline("2026-10-20T12:00:00Z").unwrap();
        assert_eq!(ms, 1_792_497_600_000);
    }

    #[test]
    fn parses_date_as_end_of_day() {
        let ms = parse_deadline("2026-10-20").unwrap();
        let noon = parse_deadline("2026-10-20T12:00:00Z").unwrap();
        assert_eq!(ms - noon, (11 * 3600 + 59 * 60 + 59) * 1000);
    }

    #[test]
    fn rejects_garbage_deadline() {
        assert!(parse_deadline("next tuesday").is_err());
    }

    #[test]
    fn status_and_priority_parsers() {
        assert_eq!(parse_status("next_action"), Ok(TaskStatus::NextAction));
        assert!(parse_status("done").is_err());
        assert_eq!(parse_priority("URGENT"), Ok(Priority::Urgent));
        assert!(parse_priority("critical").is_err());
    }

    #[test]
    fn builds_task() {
        let args = AddArgs {
            title: "Call Bob".to_string(),
            id: Some("call-bob".to_string()),
            duration: 10,
            deadline: Some("2026-10-20".to_string()),
            urgent: true,
            important: false,
            context: "@phone".to_string(),
            category: "calls".to_string(),
            status: TaskStatus::NextAction,
            priority: Priority::Low,
            depends_on: vec!["find-number".to_string()],
        };

        let task = args.to_task().unwrap();
        assert_eq!(task.id, "call-bob");
        assert_eq!(task.estimated_duration, 10);
        assert!(task.deadline.is_some());
        assert!(task.urgent);
        assert_eq!(task.context, "@phone");
        assert_eq!(task.dependencies, vec!["find-number"]);
    }
}
