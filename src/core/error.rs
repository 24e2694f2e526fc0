//! 编排层错误类型
//!
//! RunError 描述单个 Run 的终止失败；TurnError 是一轮对话中止的原因，交由调用方决定重试或上报。
//! 单条工具调用的解码 / 分发失败不在此列，记录在 TurnReport 中，不会中止整批。

use thiserror::Error;

use crate::assistant::{ApiError, LastError, RunStatus};
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// 远端以 failed / cancelled / expired / incomplete 结束
    #[error("Run {run_id} ended with status {status}")]
    Failed {
        run_id: String,
        status: RunStatus,
        last_error: Option<LastError>,
    },

    /// 轮询次数用尽仍未终止
    #[error("Run {run_id} still pending after {attempts} polls")]
    Timeout { run_id: String, attempts: u32 },

    /// 轮询时遇到不可重试的远端错误
    #[error("Polling run {run_id} failed: {source}")]
    Api {
        run_id: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("Task store truncation failed: {0}")]
    Truncate(#[source] StoreError),

    #[error("Task snapshot failed: {0}")]
    Snapshot(#[source] StoreError),

    #[error("Message append failed: {0}")]
    Message(#[source] ApiError),

    #[error("Run creation failed: {0}")]
    CreateRun(#[source] ApiError),

    #[error(transparent)]
    Run(#[from] RunError),
}

impl TurnError {
    /// 连接类故障可整轮重试；Run 失败、快照失败等视为永久
    pub fn is_retryable(&self) -> bool {
        match self {
            TurnError::Message(e) | TurnError::CreateRun(e) => e.is_retryable(),
            TurnError::Run(RunError::Timeout { .. }) => true,
            TurnError::Run(RunError::Api { source, .. }) => source.is_retryable(),
            TurnError::Run(RunError::Failed { .. })
            | TurnError::Truncate(_)
            | TurnError::Snapshot(_) => false,
        }
    }
}
