//! Core types for task triage.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Task priority tier.
///
/// Ordered by rank: `Low < Medium < High < Urgent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }

    /// Map a priority score to its tier.
    pub fn from_score(score: u32) -> Self {
        if score >= 70 {
            Priority::Urgent
        } else if score >= 50 {
            Priority::High
        } else if score >= 30 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch priority. Batches have no urgent tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPriority {
    #[default]
    Low,
    Medium,
    High,
}

impl BatchPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchPriority::Low => "low",
            BatchPriority::Medium => "medium",
            BatchPriority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(BatchPriority::Low),
            "medium" => Some(BatchPriority::Medium),
            "high" => Some(BatchPriority::High),
            _ => None,
        }
    }
}

impl From<Priority> for BatchPriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Low => BatchPriority::Low,
            Priority::Medium => BatchPriority::Medium,
            Priority::High | Priority::Urgent => BatchPriority::High,
        }
    }
}

impl fmt::Display for BatchPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GTD status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Inbox,
    NextAction,
    WaitingFor,
    Project,
    SomedayMaybe,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::NextAction => "next-action",
            TaskStatus::WaitingFor => "waiting-for",
            TaskStatus::Project => "project",
            TaskStatus::SomedayMaybe => "someday-maybe",
            TaskStatus::Completed => "completed",
        }
    }

    /// Parse a status name. Accepts `_` in place of `-`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "inbox" => Some(TaskStatus::Inbox),
            "next-action" => Some(TaskStatus::NextAction),
            "waiting-for" => Some(TaskStatus::WaitingFor),
            "project" => Some(TaskStatus::Project),
            "someday-maybe" => Some(TaskStatus::SomedayMaybe),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Deadline as epoch milliseconds.
    #[serde(default)]
    pub deadline: Option<i64>,
    /// Estimated duration in minutes. Zero marks an incomplete record.
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_duration: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urgent: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub important: bool,

    // Grouping keys
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,

    /// Ids of the tasks this task depends on.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub batch_id: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: i64,
}

impl Task {
    /// Create a task with the given id, title and duration; everything else defaulted.
    pub fn new(id: impl Into<String>, title: impl Into<String>, estimated_duration: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            deadline: None,
            estimated_duration,
            priority: Priority::default(),
            status: TaskStatus::default(),
            urgent: false,
            important: false,
            context: String::new(),
            category: String::new(),
            dependencies: Vec::new(),
            batch_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_completed()
    }

    pub fn depends_on(&self, task_id: &str) -> bool {
        self.dependencies.iter().any(|d| d == task_id)
    }
}

/// A persisted batch of similar tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBatch {
    pub id: String,
    pub name: String,
    /// Member task ids.
    pub tasks: Vec<String>,
    /// Sum of member durations when the batch was formed.
    pub total_duration: u32,
    pub context: String,
    pub priority: BatchPriority,
    pub created_at: i64,
}

/// A batch proposed by the engine, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    pub name: String,
    pub tasks: Vec<String>,
    pub total_duration: u32,
    pub context: String,
    pub priority: BatchPriority,
}

impl NewBatch {
    /// Attach a persisted id and creation time.
    pub fn into_batch(self, id: String, created_at: i64) -> TaskBatch {
        TaskBatch {
            id,
            name: self.name,
            tasks: self.tasks,
            total_duration: self.total_duration,
            context: self.context,
            priority: self.priority,
            created_at,
        }
    }
}

/// A computed priority change for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChange {
    pub task_id: String,
    pub from: Priority,
    pub to: Priority,
    pub score: u32,
}
