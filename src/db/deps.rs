//! Dependency operations and cycle detection.

use super::Database;
use super::tasks::get_task_internal;
use crate::error::EngineError;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use std::collections::{HashSet, VecDeque};
use tracing::info;

/// Check whether `depends_on` already (transitively) depends on `task_id`.
fn would_create_cycle(conn: &Connection, task_id: &str, depends_on: &str) -> Result<bool> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(depends_on.to_string());

    let mut stmt = conn.prepare("SELECT depends_on FROM task_dependencies WHERE task_id = ?1")?;

    while let Some(current) = queue.pop_front() {
        if current == task_id {
            return Ok(true);
        }

        if !visited.insert(current.clone()) {
            continue;
        }

        let next = stmt
            .query_map(params![&current], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        for dep in next {
            if !visited.contains(&dep) {
                queue.push_back(dep);
            }
        }
    }

    Ok(false)
}

impl Database {
    /// Record that `task_id` depends on `depends_on`.
    pub fn add_dependency(&self, task_id: &str, depends_on: &str) -> Result<()> {
        if task_id == depends_on {
            return Err(anyhow!("A task cannot depend on itself"));
        }

        self.with_conn(|conn| {
            for id in [task_id, depends_on] {
                if get_task_internal(conn, id)?.is_none() {
                    return Err(EngineError::task_not_found(id).into());
                }
            }

            if would_create_cycle(conn, task_id, depends_on)? {
                return Err(anyhow!(
                    "Adding dependency {} -> {} would create a cycle",
                    task_id,
                    depends_on
                ));
            }

            conn.execute(
                "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on) VALUES (?1, ?2)",
                params![task_id, depends_on],
            )?;
            info!(task_id, depends_on, "Added dependency");
            Ok(())
        })
    }

    /// Remove a dependency. Returns false if it did not exist.
    pub fn remove_dependency(&self, task_id: &str, depends_on: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM task_dependencies WHERE task_id = ?1 AND depends_on = ?2",
                params![task_id, depends_on],
            )?;
            Ok(removed > 0)
        })
    }

    /// Ids of tasks that depend on `task_id`.
    pub fn get_dependents(&self, task_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id FROM task_dependencies WHERE depends_on = ?1 ORDER BY rowid",
            )?;
            let ids = stmt
                .query_map(params![task_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
    }
}
