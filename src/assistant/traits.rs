//! 远端 Assistant 服务抽象
//!
//! 所有后端（HTTP / Scripted Mock）实现 AssistantApi：线程、消息、Run 的创建与查询。

use async_trait::async_trait;
use thiserror::Error;

use super::types::{AssistantSpec, Run, ToolOutput};

/// 远端调用错误；is_retryable 区分可重试的连接类故障与永久故障
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 客户端本身无法构建（如 TLS 后端初始化失败）
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// 连接失败 / 超时、429、5xx 可重试；4xx、解码失败与客户端构建失败不可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Client(_) | ApiError::Decode(_) => false,
        }
    }
}

#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// 创建 Assistant，返回其 id
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ApiError>;

    /// 创建空线程，返回其 id
    async fn create_thread(&self) -> Result<String, ApiError>;

    /// 以 user 角色向线程追加一条消息，返回消息 id
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<String, ApiError>;

    /// 在线程上启动 Run；instructions 为本次 Run 的附加上下文
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> Result<Run, ApiError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ApiError>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ApiError>;
}
