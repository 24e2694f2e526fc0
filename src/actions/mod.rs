//! 动作层：工具调用解码（Command）、命令分发（CommandDispatcher）、工具描述生成

pub mod command;
pub mod dispatcher;
pub mod schema;

pub use command::{
    Command, DecodeError, TaskIdArgs, UpdateTaskArgs, ADD_TASK, COMPLETE_TASK, REMOVE_TASK,
    UPDATE_TASK,
};
pub use dispatcher::{CommandDispatcher, DispatchError, DispatchOutcome};
pub use schema::{task_tools, tools_json};
