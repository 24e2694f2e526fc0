//! 内存任务存储（用于测试与离线演示，进程退出即丢失）

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::task::{validate_new_task, NewTask, StoreError, Task, TaskStore, TaskUpdate, DEFAULT_PRIORITY};

/// 内存实现：Vec 保持插入顺序；额外统计写操作次数，便于测试断言
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
    writes: AtomicU64,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// create / update 被调用的累计次数（含失败的调用）
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, input: NewTask) -> Result<Task, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
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
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.apply(&update);
        Ok(task.clone())
    }

    async fn list(&self, only_pending: bool) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| !only_pending || !t.completed)
            .cloned()
            .collect())
    }

    async fn purge(&self, completed_only: bool) -> Result<usize, StoreError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        if completed_only {
            tasks.retain(|t| !t.completed);
        } else {
            tasks.clear();
        }
        Ok(before - tasks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let store = MemoryTaskStore::new();
        let task = store.create(NewTask::named("Go to the gym")).await.unwrap();
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert!(!task.completed);
        assert!(!task.deleted);
        assert!(!task.id.is_empty());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = MemoryTaskStore::new();
        let err = store.update("missing", TaskUpdate::completed()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row() {
        let store = MemoryTaskStore::new();
        let task = store.create(NewTask::named("Taxes")).await.unwrap();
        store.soft_delete(&task.id).await.unwrap();

        let all = store.list(false).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].deleted);
    }

    #[tokio::test]
    async fn test_list_pending_and_purge_completed() {
        let store = MemoryTaskStore::new();
        let a = store.create(NewTask::named("A")).await.unwrap();
        store.create(NewTask::named("B")).await.unwrap();
        store.complete(&a.id).await.unwrap();

        let pending = store.list(true).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "B");

        assert_eq!(store.purge(true).await.unwrap(), 1);
        assert_eq!(store.purge(false).await.unwrap(), 1);
        assert!(store.list(false).await.unwrap().is_empty());
    }
}
