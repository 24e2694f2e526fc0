//! SQLite 任务存储（rusqlite，同步连接置于 Mutex 后）
//!
//! 每个操作在持锁期间完成，不跨 await，单条操作原子；启动时自动建表。

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::task::{validate_new_task, NewTask, StoreError, Task, TaskStore, TaskUpdate, DEFAULT_PRIORITY};

const TASK_COLUMNS: &str = "id, name, priority, completed, deleted, created_at, updated_at";

pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// 打开（或新建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 2,
                completed INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection mutex poisoned".to_string()))
    }
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        priority: row.get(2)?,
        completed: row.get(3)?,
        deleted: row.get(4)?,
        created_at: row.get::<_, DateTime<Utc>>(5)?,
        updated_at: row.get::<_, DateTime<Utc>>(6)?,
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, input: NewTask) -> Result<Task, StoreError> {
        validate_new_task(&input)?;
        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            priority: input.priority.unwrap_or(DEFAULT_PRIORITY),
            completed: input.completed.unwrap_or(false),
            deleted: input.deleted.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, name, priority, completed, deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id,
                task.name,
                task.priority,
                task.completed,
                task.deleted,
                task.created_at,
                task.updated_at
            ],
        )?;
        tracing::debug!(task_id = %task.id, "task row inserted");
        Ok(task)
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut task = tx
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.apply(&update);
        tx.execute(
            "UPDATE tasks SET name = ?2, priority = ?3, completed = ?4, deleted = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                task.id,
                task.name,
                task.priority,
                task.completed,
                task.deleted,
                task.updated_at
            ],
        )?;
        tx.commit()?;
        Ok(task)
    }

    async fn list(&self, only_pending: bool) -> Result<Vec<Task>, StoreError> {
        let conn = self.lock()?;
        let sql = if only_pending {
            format!("SELECT {TASK_COLUMNS} FROM tasks WHERE completed = 0 ORDER BY created_at, rowid")
        } else {
            format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, rowid")
        };
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    async fn purge(&self, completed_only: bool) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = if completed_only {
            conn.execute("DELETE FROM tasks WHERE completed = 1", [])?
        } else {
            conn.execute("DELETE FROM tasks", [])?
        };
        Ok(removed)
    }
}
