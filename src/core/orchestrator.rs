//! 单轮编排：（可选）清空任务库 → 快照任务 → 追加用户消息 → 创建 Run（附任务快照）→ 轮询至终止 → 逐条解码并分发
//!
//! 所有远端调用与存储操作串行执行；单条工具调用的解码 / 分发失败只记入报告，不中断整批。
//! 清空、快照、消息追加、Run 创建、Run 失败则中止本轮并以 TurnError 返回。

use std::sync::Arc;

use serde_json::json;

use crate::actions::{Command, CommandDispatcher, DecodeError, DispatchError, DispatchOutcome, task_tools};
use crate::assistant::{ApiError, AssistantApi, AssistantSpec, Run, RunStatus, ToolCall, ToolOutput};
use crate::config::AssistantSection;
use crate::core::prompts::{mission_statement, run_instructions, user_message_content};
use crate::core::{PollPolicy, RunPoller, TurnError};
use crate::store::TaskStore;

/// 单条工具调用的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied(DispatchOutcome),
    DecodeFailed(DecodeError),
    DispatchFailed(DispatchError),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied(_))
    }

    /// 回传给 Run 的输出文本
    fn tool_output(&self) -> String {
        match self {
            ActionOutcome::Applied(outcome) => json!({"ok": true, "taskId": outcome.task().id}),
            ActionOutcome::DecodeFailed(e) => json!({"ok": false, "error": e.to_string()}),
            ActionOutcome::DispatchFailed(e) => json!({"ok": false, "error": e.to_string()}),
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub call_id: String,
    pub function: String,
    pub outcome: ActionOutcome,
}

/// 一轮对话的结果：Run 最终状态与每条工具调用的处理结果（与上报顺序一致）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub run_id: String,
    pub status: RunStatus,
    pub actions: Vec<ActionReport>,
    /// 回传工具输出失败时的错误（未启用或成功时为 None）
    pub submit_error: Option<ApiError>,
}

impl TurnReport {
    pub fn applied(&self) -> usize {
        self.actions.iter().filter(|a| a.outcome.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.actions.len() - self.applied()
    }
}

pub struct TurnOrchestrator {
    api: Arc<dyn AssistantApi>,
    store: Arc<dyn TaskStore>,
    dispatcher: CommandDispatcher,
    poller: RunPoller,
    assistant_id: String,
    submit_tool_outputs: bool,
    truncate: bool,
}

impl TurnOrchestrator {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        store: Arc<dyn TaskStore>,
        assistant_id: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store.clone()),
            poller: RunPoller::new(api.clone(), policy),
            api,
            store,
            assistant_id: assistant_id.into(),
            submit_tool_outputs: false,
            truncate: false,
        }
    }

    /// 启用后每轮在追加消息之前清空任务库（快照因此为空）
    pub fn with_truncate(mut self, enabled: bool) -> Self {
        self.truncate = enabled;
        self
    }

    pub fn with_submit_tool_outputs(mut self, enabled: bool) -> Self {
        self.submit_tool_outputs = enabled;
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// 跑一轮：user_message 为用户原始输入
    pub async fn run_turn(&self, thread_id: &str, user_message: &str) -> Result<TurnReport, TurnError> {
        if self.truncate {
            let removed = self.store.purge(false).await.map_err(TurnError::Truncate)?;
            tracing::info!(removed, "All tasks deleted");
        }

        let snapshot = self.store.list(false).await.map_err(TurnError::Snapshot)?;
        tracing::info!(tasks = snapshot.len(), "Retrieved task snapshot");

        let message_id = self
            .api
            .create_message(thread_id, &user_message_content(user_message))
            .await
            .map_err(TurnError::Message)?;
        tracing::info!(thread_id, message_id = %message_id, "Created message");

        let run = self
            .api
            .create_run(thread_id, &self.assistant_id, &run_instructions(&snapshot))
            .await
            .map_err(TurnError::CreateRun)?;
        tracing::info!(run_id = %run.id, status = %run.status, "Created run");

        let finished = self.poller.wait_for_terminal(&run).await?;
        let calls = finished.tool_calls().to_vec();
        if calls.is_empty() {
            tracing::info!(run_id = %finished.id, "No actions required");
            return Ok(TurnReport {
                run_id: finished.id,
                status: finished.status,
                actions: Vec::new(),
                submit_error: None,
            });
        }

        let actions = self.apply_calls(&calls).await;
        let submit_error = self.acknowledge(&finished, &actions).await;

        let report = TurnReport {
            run_id: finished.id,
            status: finished.status,
            actions,
            submit_error,
        };
        tracing::info!(
            run_id = %report.run_id,
            applied = report.applied(),
            failed = report.failed(),
            "Turn finished"
        );
        Ok(report)
    }

    /// 按上报顺序逐条解码并分发；任一条失败都继续处理后续
    async fn apply_calls(&self, calls: &[ToolCall]) -> Vec<ActionReport> {
        let mut reports = Vec::with_capacity(calls.len());
        for call in calls {
            let outcome = match Command::decode(call) {
                Ok(command) => match self.dispatcher.dispatch(command).await {
                    Ok(outcome) => ActionOutcome::Applied(outcome),
                    Err(e) => ActionOutcome::DispatchFailed(e),
                },
                Err(e) => {
                    tracing::warn!(
                        call_id = %call.id,
                        function = %call.function.name,
                        error = %e,
                        "Skipping undecodable tool call"
                    );
                    ActionOutcome::DecodeFailed(e)
                }
            };
            reports.push(ActionReport {
                call_id: call.id.clone(),
                function: call.function.name.clone(),
                outcome,
            });
        }
        reports
    }

    /// 启用时把每条结果回传给停在 requires_action 的 Run；失败只记录
    async fn acknowledge(&self, run: &Run, actions: &[ActionReport]) -> Option<ApiError> {
        if !self.submit_tool_outputs || run.status != RunStatus::RequiresAction {
            return None;
        }
        let outputs: Vec<ToolOutput> = actions
            .iter()
            .map(|a| ToolOutput {
                tool_call_id: a.call_id.clone(),
                output: a.outcome.tool_output(),
            })
            .collect();
        match self
            .api
            .submit_tool_outputs(&run.thread_id, &run.id, &outputs)
            .await
        {
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(run_id = %run.id, error = %e, "Submitting tool outputs failed");
                Some(e)
            }
        }
    }
}

/// 已配置 assistant_id 时直接复用，否则按使命说明与任务函数新建
pub async fn ensure_assistant(
    api: &dyn AssistantApi,
    cfg: &AssistantSection,
) -> Result<String, ApiError> {
    if let Some(id) = &cfg.assistant_id {
        tracing::info!(assistant_id = %id, "Reusing configured assistant");
        return Ok(id.clone());
    }
    tracing::info!("Creating assistant...");
    api.create_assistant(&AssistantSpec {
        name: cfg.name.clone(),
        model: cfg.model.clone(),
        instructions: mission_statement(),
        tools: task_tools(),
    })
    .await
}
