//! 任务存储层：Task 数据模型、TaskStore 接口，以及内存 / SQLite 两种实现
//!
//! 核心编排只依赖 `Arc<dyn TaskStore>`，由调用方注入；测试用 MemoryTaskStore，CLI 用 SqliteTaskStore。

pub mod memory;
pub mod sqlite;
pub mod task;

pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;
pub use task::{NewTask, StoreError, Task, TaskStore, TaskUpdate, DEFAULT_PRIORITY};
