//! Structured error types for engine and service results.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidTaskRecord,

    // Not found errors
    TaskNotFound,
    BatchNotFound,

    // Write errors
    PersistenceFailure,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error reported by the engine and the task service.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            task_id: None,
            field: None,
            details: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    /// A task record that cannot be scored or batched.
    pub fn invalid_task(task_id: &str, field: &str) -> Self {
        let label = if task_id.is_empty() { "<no id>" } else { task_id };
        Self::new(
            ErrorCode::InvalidTaskRecord,
            format!("Task {} is missing required field {}", label, field),
        )
        .with_task(task_id)
        .with_field(field)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
        .with_task(task_id)
    }

    pub fn batch_not_found(batch_id: &str) -> Self {
        Self::new(
            ErrorCode::BatchNotFound,
            format!("Batch not found: {}", batch_id),
        )
    }

    /// A repository write that failed. `operation` names the write.
    pub fn persistence(operation: &str, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::PersistenceFailure,
            format!("{} failed: {}", operation, err),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err,
            Err(err) => match err.downcast::<rusqlite::Error>() {
                Ok(db_err) => EngineError::database(db_err),
                Err(err) => EngineError::internal(err),
            },
        }
    }
}
