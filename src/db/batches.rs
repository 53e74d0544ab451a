//! Batch storage.

use super::{Database, now_ms};
use crate::error::EngineError;
use crate::types::{BatchPriority, NewBatch, TaskBatch};
use anyhow::Result;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

impl FromSql for BatchPriority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        BatchPriority::from_str(s).ok_or_else(|| {
            FromSqlError::Other(Box::new(EngineError::invalid_value(
                "priority",
                &format!("Unknown stored batch priority '{}'", s),
            )))
        })
    }
}

fn parse_batch_row(row: &Row) -> rusqlite::Result<TaskBatch> {
    Ok(TaskBatch {
        id: row.get("id")?,
        name: row.get("name")?,
        tasks: Vec::new(),
        total_duration: row.get("total_duration")?,
        context: row.get("context")?,
        priority: row.get("priority")?,
        created_at: row.get("created_at")?,
    })
}

fn load_members(conn: &Connection, batch_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT task_id FROM task_batch_members WHERE batch_id = ?1 ORDER BY position",
    )?;
    let members = stmt
        .query_map(params![batch_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(members)
}

/// Insert a batch and its membership list. Does not touch `tasks.batch_id`.
pub(crate) fn insert_batch(conn: &Connection, batch: &NewBatch) -> Result<TaskBatch> {
    let id = Uuid::now_v7().to_string();
    let created_at = now_ms();

    conn.execute(
        "INSERT INTO task_batches (id, name, context, priority, total_duration, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            batch.name,
            batch.context,
            batch.priority.as_str(),
            batch.total_duration,
            created_at,
        ],
    )?;

    for (position, task_id) in batch.tasks.iter().enumerate() {
        conn.execute(
            "INSERT INTO task_batch_members (batch_id, task_id, position) VALUES (?1, ?2, ?3)",
            params![id, task_id, position as i64],
        )?;
    }

    info!(batch_id = %id, name = %batch.name, size = batch.tasks.len(), "Created batch");
    Ok(batch.clone().into_batch(id, created_at))
}

/// Point a task at a batch.
pub(crate) fn assign_task(conn: &Connection, task_id: &str, batch_id: &str) -> Result<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM task_batches WHERE id = ?1",
            params![batch_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !exists {
        return Err(EngineError::batch_not_found(batch_id).into());
    }

    let updated = conn.execute(
        "UPDATE tasks SET batch_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![batch_id, now_ms(), task_id],
    )?;
    if updated == 0 {
        return Err(EngineError::task_not_found(task_id).into());
    }
    Ok(())
}

impl Database {
    /// Get a batch with its member ids.
    pub fn get_batch(&self, batch_id: &str) -> Result<Option<TaskBatch>> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT * FROM task_batches WHERE id = ?1",
                params![batch_id],
                parse_batch_row,
            );

            match result {
                Ok(mut batch) => {
                    batch.tasks = load_members(conn, batch_id)?;
                    Ok(Some(batch))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List all batches in creation order.
    pub fn list_all_batches(&self) -> Result<Vec<TaskBatch>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM task_batches ORDER BY created_at, rowid")?;
            let mut batches = stmt
                .query_map([], parse_batch_row)?
                .collect::<rusqlite::Result<Vec<TaskBatch>>>()?;

            let mut members: HashMap<String, Vec<String>> = HashMap::new();
            let mut stmt = conn.prepare(
                "SELECT batch_id, task_id FROM task_batch_members ORDER BY batch_id, position",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (batch_id, task_id) = row?;
                members.entry(batch_id).or_default().push(task_id);
            }

            for batch in &mut batches {
                batch.tasks = members.remove(&batch.id).unwrap_or_default();
            }

            Ok(batches)
        })
    }
}
