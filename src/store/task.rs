//! Task 数据模型与存储接口
//!
//! Task 只做软删除（deleted 标记）；物理删除只有 purge 一条路径，核心编排从不调用。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 未指定优先级时的默认值（1 最高，3 最低）
pub const DEFAULT_PRIORITY: i32 = 2;

/// 一条任务记录（id 由存储层分配）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub priority: i32,
    pub completed: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// 按 TaskUpdate 覆盖已设置的字段，并刷新 updated_at
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        if let Some(deleted) = update.deleted {
            self.deleted = deleted;
        }
        self.updated_at = Utc::now();
    }
}

/// The details of a task to be added.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewTask {
    /// The name of the task.
    pub name: String,
    /// The priority of the task, with lower numbers indicating higher priority (1 top, 3 bottom).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Whether the task is marked as completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Whether the task is marked as deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// The fields to change on an existing task; omitted fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskUpdate {
    /// The updated name of the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The updated priority of the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// The updated completed status of the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// The updated deleted status of the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl TaskUpdate {
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    pub fn deleted() -> Self {
        Self {
            deleted: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.deleted.is_none()
    }
}

/// 存储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid task: {0}")]
    Invalid(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// 任务存储接口：单条操作在存储层原子，批量分发不包事务
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// 新建任务；名称去空白后不能为空
    async fn create(&self, input: NewTask) -> Result<Task, StoreError>;

    /// 更新任务的部分字段，返回更新后的记录
    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError>;

    /// 列出任务（按创建时间）；only_pending 时只返回未完成的
    async fn list(&self, only_pending: bool) -> Result<Vec<Task>, StoreError>;

    /// 物理删除全部任务，或仅删除已完成的；返回删除条数
    async fn purge(&self, completed_only: bool) -> Result<usize, StoreError>;

    async fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        self.update(id, TaskUpdate::deleted()).await.map(|_| ())
    }

    async fn complete(&self, id: &str) -> Result<(), StoreError> {
        self.update(id, TaskUpdate::completed()).await.map(|_| ())
    }
}

/// create 前的统一校验，两种实现共用
pub(crate) fn validate_new_task(input: &NewTask) -> Result<(), StoreError> {
    if input.name.trim().is_empty() {
        return Err(StoreError::Invalid("task name must not be empty".to_string()));
    }
    Ok(())
}
