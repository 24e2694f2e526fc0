//! Assistants API 线上数据结构（Run / ToolCall / 工具描述）

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Run 状态；未知值落入 Unknown，按未终止处理
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

/// 轮询视角下的状态分类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// 继续轮询
    Pending,
    /// 工具调用已就绪
    ActionRequired,
    Completed,
    /// failed / cancelled / expired / incomplete
    Failed,
}

impl RunStatus {
    pub fn phase(self) -> RunPhase {
        match self {
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling | RunStatus::Unknown => {
                RunPhase::Pending
            }
            RunStatus::RequiresAction => RunPhase::ActionRequired,
            RunStatus::Completed => RunPhase::Completed,
            RunStatus::Cancelled | RunStatus::Failed | RunStatus::Expired | RunStatus::Incomplete => {
                RunPhase::Failed
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        self.phase() != RunPhase::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 远端要求调用的函数：名称 + JSON 编码的参数字符串
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_tool_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub submit_tool_outputs: SubmitToolOutputs,
}

/// 远端上报的失败原因
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<LastError>,
}

impl Run {
    pub fn new(id: impl Into<String>, thread_id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            status,
            required_action: None,
            last_error: None,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.required_action = Some(RequiredAction {
            kind: "submit_tool_outputs".to_string(),
            submit_tool_outputs: SubmitToolOutputs { tool_calls },
        });
        self
    }

    pub fn with_last_error(mut self, code: &str, message: &str) -> Self {
        self.last_error = Some(LastError {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// 附带的工具调用（无则为空），与状态无关
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .map(|a| a.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

/// 回传给 Run 的单条工具输出
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// 函数描述：`{type: "function", function: {name, description, parameters}}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 创建 Assistant 所需的描述
#[derive(Clone, Debug)]
pub struct AssistantSpec {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<FunctionTool>,
}
