//! 脚本化 Assistant（用于测试，无需 API）
//!
//! create_run 返回初始状态；之后每次 retrieve_run 依次弹出预置的 Run 状态，
//! 脚本耗尽后重复最后一次结果。所有调用都会被记录，便于断言。

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{ApiError, AssistantApi};
use super::types::{AssistantSpec, Run, RunStatus, ToolOutput};

/// 已记录的调用
#[derive(Debug, Default, Clone)]
pub struct RecordedCalls {
    pub assistants: Vec<String>,
    pub threads: usize,
    pub messages: Vec<(String, String)>,
    pub run_instructions: Vec<String>,
    pub retrieves: usize,
    pub submitted: Vec<ToolOutput>,
}

#[derive(Debug)]
struct ScriptState {
    initial: Result<Run, ApiError>,
    script: VecDeque<Result<Run, ApiError>>,
    last: Option<Result<Run, ApiError>>,
    calls: RecordedCalls,
}

#[derive(Debug)]
pub struct ScriptedAssistant {
    state: Mutex<ScriptState>,
}

impl ScriptedAssistant {
    /// 初始 Run 为 queued；script 为后续每次轮询返回的状态
    pub fn new(script: Vec<Run>) -> Self {
        Self::with_results(script.into_iter().map(Ok).collect())
    }

    pub fn with_results(script: Vec<Result<Run, ApiError>>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                initial: Ok(Run::new("run_1", "thread_1", RunStatus::Queued)),
                script: script.into(),
                last: None,
                calls: RecordedCalls::default(),
            }),
        }
    }

    /// 覆盖 create_run 的返回值（如让 Run 创建即失败）
    pub fn with_initial(self, initial: Result<Run, ApiError>) -> Self {
        self.lock().initial = initial;
        self
    }

    pub fn calls(&self) -> RecordedCalls {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        // 测试替身：锁中毒只可能来自已 panic 的测试
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AssistantApi for ScriptedAssistant {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ApiError> {
        let mut state = self.lock();
        state.calls.assistants.push(spec.name.clone());
        Ok(format!("asst_{}", state.calls.assistants.len()))
    }

    async fn create_thread(&self) -> Result<String, ApiError> {
        let mut state = self.lock();
        state.calls.threads += 1;
        Ok(format!("thread_{}", state.calls.threads))
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<String, ApiError> {
        let mut state = self.lock();
        state
            .calls
            .messages
            .push((thread_id.to_string(), content.to_string()));
        Ok(format!("msg_{}", state.calls.messages.len()))
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
        instructions: &str,
    ) -> Result<Run, ApiError> {
        let mut state = self.lock();
        state.calls.run_instructions.push(instructions.to_string());
        state.initial.clone()
    }

    async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, ApiError> {
        let mut state = self.lock();
        state.calls.retrieves += 1;
        match state.script.pop_front() {
            Some(next) => {
                state.last = Some(next.clone());
                next
            }
            None => match (&state.last, &state.initial) {
                (Some(last), _) => last.clone(),
                (None, initial) => initial.clone(),
            },
        }
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ApiError> {
        let mut state = self.lock();
        state.calls.submitted.extend_from_slice(outputs);
        Ok(Run::new(run_id, thread_id, RunStatus::Queued))
    }
}
