//! SQLite storage for tasks and batches.

pub mod batches;
pub mod deps;
pub mod import;
pub mod tasks;

use crate::repository::{BatchCommit, TaskRepository};
use crate::types::{NewBatch, Priority, Task, TaskBatch};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let report = embedded::migrations::runner().run(&mut *conn)?;
        debug!(applied = report.applied_migrations().len(), "Database migrations complete");
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }
}

impl TaskRepository for Database {
    fn list_tasks(&self) -> Result<Vec<Task>> {
        self.list_all_tasks(true)
    }

    fn list_open_tasks(&self) -> Result<Vec<Task>> {
        self.list_all_tasks(false)
    }

    fn list_batches(&self) -> Result<Vec<TaskBatch>> {
        self.list_all_batches()
    }

    fn apply_priority(&self, task_id: &str, priority: Priority) -> Result<()> {
        self.set_priority(task_id, priority)
    }

    fn create_batch(&self, batch: &NewBatch) -> Result<TaskBatch> {
        self.with_conn(|conn| batches::insert_batch(conn, batch))
    }

    fn assign_task_to_batch(&self, task_id: &str, batch_id: &str) -> Result<()> {
        self.with_conn(|conn| batches::assign_task(conn, task_id, batch_id))
    }

    /// Batch creation and member assignment in one transaction.
    fn commit_batch(&self, batch: &NewBatch) -> Result<BatchCommit> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let created = batches::insert_batch(&tx, batch)?;
            for task_id in &created.tasks {
                batches::assign_task(&tx, task_id, &created.id)?;
            }
            tx.commit()?;

            Ok(BatchCommit {
                assigned: created.tasks.clone(),
                batch: created,
                failures: Vec::new(),
            })
        })
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
