//! 命令分发器
//!
//! 每个 Command 恰好对应一次 TaskStore 调用；批量时严格按接收顺序串行执行，
//! 单条失败只记录、不中断后续命令；从不自动重试（重试 create 会产生重复任务）。
//! 每次分发输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::actions::Command;
use crate::store::{StoreError, Task, TaskStore, TaskUpdate};

/// 分发成功后的结果（均携带变更后的任务）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Created(Task),
    Updated(Task),
    Completed(Task),
    Removed(Task),
}

impl DispatchOutcome {
    pub fn task(&self) -> &Task {
        match self {
            DispatchOutcome::Created(t)
            | DispatchOutcome::Updated(t)
            | DispatchOutcome::Completed(t)
            | DispatchOutcome::Removed(t) => t,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{function} failed: {source}")]
pub struct DispatchError {
    pub function: &'static str,
    #[source]
    pub source: StoreError,
}

pub struct CommandDispatcher {
    store: Arc<dyn TaskStore>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// 执行单条命令
    pub async fn dispatch(&self, command: Command) -> Result<DispatchOutcome, DispatchError> {
        let function = command.function_name();
        let start = Instant::now();

        let result = match command {
            Command::AddTask(input) => self.store.create(input).await.map(DispatchOutcome::Created),
            Command::UpdateTask { id, updates } => {
                self.store.update(&id, updates).await.map(DispatchOutcome::Updated)
            }
            Command::CompleteTask { id } => self
                .store
                .update(&id, TaskUpdate::completed())
                .await
                .map(DispatchOutcome::Completed),
            Command::RemoveTask { id } => self
                .store
                .update(&id, TaskUpdate::deleted())
                .await
                .map(DispatchOutcome::Removed),
        };

        let audit = serde_json::json!({
            "event": "task_dispatch",
            "function": function,
            "ok": result.is_ok(),
            "task_id": result.as_ref().ok().map(|o| o.task().id.clone()),
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        match &result {
            Ok(outcome) => {
                let task = outcome.task();
                tracing::info!(
                    audit = %audit,
                    "Task {} {} (name: {}, priority: {})",
                    task.id,
                    outcome_verb(outcome),
                    task.name,
                    task.priority
                );
            }
            Err(e) => tracing::warn!(audit = %audit, error = %e, "dispatch failed"),
        }

        result.map_err(|source| DispatchError { function, source })
    }

    /// 按顺序逐条分发，返回与输入一一对应的结果
    pub async fn dispatch_all(
        &self,
        commands: Vec<Command>,
    ) -> Vec<Result<DispatchOutcome, DispatchError>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.dispatch(command).await);
        }
        results
    }
}

fn outcome_verb(outcome: &DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Created(_) => "created",
        DispatchOutcome::Updated(_) => "updated",
        DispatchOutcome::Completed(_) => "marked as completed",
        DispatchOutcome::Removed(_) => "marked as deleted",
    }
}
