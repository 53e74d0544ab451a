//! Task CRUD operations.

use super::{Database, now_ms};
use crate::engine::validate_task;
use crate::error::EngineError;
use crate::types::{Priority, Task, TaskStatus};
use anyhow::Result;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Priority::from_str(s).ok_or_else(|| {
            FromSqlError::Other(Box::new(EngineError::invalid_value(
                "priority",
                &format!("Unknown stored priority '{}'", s),
            )))
        })
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        TaskStatus::from_str(s).ok_or_else(|| {
            FromSqlError::Other(Box::new(EngineError::invalid_value(
                "status",
                &format!("Unknown stored status '{}'", s),
            )))
        })
    }
}

/// Decode a task row. Unknown priority or status text is a conversion error.
pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        deadline: row.get("deadline")?,
        estimated_duration: row.get("estimated_duration")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
        urgent: row.get("urgent")?,
        important: row.get("important")?,
        context: row.get("context")?,
        category: row.get("category")?,
        dependencies: Vec::new(),
        batch_id: row.get("batch_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Load dependency lists for every task, keyed by task id.
fn load_dependencies(conn: &Connection) -> Result<HashMap<String, Vec<String>>> {
    let mut stmt =
        conn.prepare("SELECT task_id, depends_on FROM task_dependencies ORDER BY task_id, rowid")?;

    let mut deps: HashMap<String, Vec<String>> = HashMap::new();
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    for row in rows {
        let (task_id, depends_on) = row?;
        deps.entry(task_id).or_default().push(depends_on);
    }

    Ok(deps)
}

fn load_task_dependencies(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT depends_on FROM task_dependencies WHERE task_id = ?1 ORDER BY rowid")?;
    let deps = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(deps)
}

/// Internal helper to get a task using an existing connection.
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(mut task) => {
            task.dependencies = load_task_dependencies(conn, task_id)?;
            Ok(Some(task))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert or replace a task row and its dependency list.
pub(crate) fn upsert_task(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO tasks (
            id, title, deadline, estimated_duration, priority, status,
            urgent, important, context, category, batch_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            task.id,
            task.title,
            task.deadline,
            task.estimated_duration,
            task.priority.as_str(),
            task.status.as_str(),
            task.urgent,
            task.important,
            task.context,
            task.category,
            task.batch_id,
            task.created_at,
            task.updated_at,
        ],
    )?;

    conn.execute(
        "DELETE FROM task_dependencies WHERE task_id = ?1",
        params![task.id],
    )?;
    for dep in &task.dependencies {
        conn.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on) VALUES (?1, ?2)",
            params![task.id, dep],
        )?;
    }

    Ok(())
}

impl Database {
    /// Create a new task.
    ///
    /// Generates a UUIDv7 id when `task.id` is empty. Timestamps are set to now.
    pub fn create_task(&self, mut task: Task) -> Result<Task> {
        if task.id.trim().is_empty() {
            task.id = Uuid::now_v7().to_string();
        }
        if task.title.trim().is_empty() {
            return Err(EngineError::missing_field("title").into());
        }
        validate_task(&task)?;
        if task.depends_on(&task.id) {
            return Err(EngineError::invalid_value("dependencies", "A task cannot depend on itself")
                .with_task(task.id.as_str())
                .into());
        }

        let now = now_ms();
        task.created_at = now;
        task.updated_at = now;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if get_task_internal(&tx, &task.id)?.is_some() {
                return Err(EngineError::invalid_value("id", "a task with this id already exists")
                    .with_task(task.id.as_str())
                    .into());
            }
            upsert_task(&tx, &task)?;
            tx.commit()?;
            Ok(())
        })?;

        info!(task_id = %task.id, title = %task.title, "Created task");
        Ok(task)
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List tasks in creation order, optionally including completed ones.
    pub fn list_all_tasks(&self, include_completed: bool) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = if include_completed {
                "SELECT * FROM tasks ORDER BY created_at, rowid"
            } else {
                "SELECT * FROM tasks WHERE status != 'completed' ORDER BY created_at, rowid"
            };

            let mut stmt = conn.prepare(sql)?;
            let mut tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<Task>>>()?;

            let mut deps = load_dependencies(conn)?;
            for task in &mut tasks {
                task.dependencies = deps.remove(&task.id).unwrap_or_default();
            }

            Ok(tasks)
        })
    }

    /// Set a task's priority.
    pub fn set_priority(&self, task_id: &str, priority: Priority) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET priority = ?1, updated_at = ?2 WHERE id = ?3",
                params![priority.as_str(), now_ms(), task_id],
            )?;
            if updated == 0 {
                return Err(EngineError::task_not_found(task_id).into());
            }
            debug!(task_id, priority = %priority, "Updated priority");
            Ok(())
        })
    }

    /// Move a task to a new GTD status.
    pub fn update_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now_ms(), task_id],
            )?;
            if updated == 0 {
                return Err(EngineError::task_not_found(task_id).into());
            }
            info!(task_id, status = %status, "Updated status");
            Ok(())
        })
    }
}
