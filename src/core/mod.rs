//! 核心编排层：错误类型、Run 轮询、提示词、单轮编排

pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod prompts;

pub use error::{RunError, TurnError};
pub use orchestrator::{ensure_assistant, ActionOutcome, ActionReport, TurnOrchestrator, TurnReport};
pub use poller::{PollPolicy, RunPoller};
pub use prompts::DEFAULT_USER_MESSAGE;
