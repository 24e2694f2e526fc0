//! 远端 Assistant 层：线上数据结构、服务抽象与实现（HTTP / Scripted Mock）

pub mod mock;
pub mod openai;
pub mod traits;
pub mod types;

pub use mock::{RecordedCalls, ScriptedAssistant};
pub use openai::{OpenAiAssistant, OPENAI_BASE_URL};
pub use traits::{ApiError, AssistantApi};
pub use types::{
    AssistantSpec, FunctionCall, FunctionDefinition, FunctionTool, LastError, RequiredAction, Run,
    RunPhase, RunStatus, SubmitToolOutputs, ToolCall, ToolOutput,
};
