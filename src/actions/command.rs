//! 工具调用解码：ToolCall（函数名 + JSON 参数字符串）→ 类型化 Command
//!
//! 每个 ToolCall 独立解码，互不影响；解码无副作用。

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assistant::ToolCall;
use crate::store::{NewTask, TaskUpdate};

pub const ADD_TASK: &str = "addTask";
pub const UPDATE_TASK: &str = "updateTask";
pub const COMPLETE_TASK: &str = "completeTask";
pub const REMOVE_TASK: &str = "removeTask";

/// Arguments of updateTask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateTaskArgs {
    /// The ID of the task to update.
    pub id: String,
    /// The updates to apply to the task.
    pub updates: TaskUpdate,
}

/// Arguments of completeTask and removeTask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskIdArgs {
    /// The ID of the task.
    pub id: String,
}

/// 解码后的任务命令（封闭集合，分发时穷尽匹配）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    AddTask(NewTask),
    UpdateTask { id: String, updates: TaskUpdate },
    CompleteTask { id: String },
    RemoveTask { id: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid arguments for {function}: {reason}")]
    InvalidArguments { function: String, reason: String },
}

fn parse_args<T: DeserializeOwned>(function: &str, raw: &str) -> Result<T, DecodeError> {
    serde_json::from_str(raw).map_err(|e| DecodeError::InvalidArguments {
        function: function.to_string(),
        reason: e.to_string(),
    })
}

impl Command {
    pub fn decode(call: &ToolCall) -> Result<Self, DecodeError> {
        let name = call.function.name.as_str();
        let raw = call.function.arguments.as_str();
        match name {
            ADD_TASK => parse_args::<NewTask>(name, raw).map(Command::AddTask),
            UPDATE_TASK => parse_args::<UpdateTaskArgs>(name, raw)
                .map(|a| Command::UpdateTask { id: a.id, updates: a.updates }),
            COMPLETE_TASK => parse_args::<TaskIdArgs>(name, raw).map(|a| Command::CompleteTask { id: a.id }),
            REMOVE_TASK => parse_args::<TaskIdArgs>(name, raw).map(|a| Command::RemoveTask { id: a.id }),
            other => Err(DecodeError::UnknownFunction(other.to_string())),
        }
    }

    /// 对应的函数名（日志用）
    pub fn function_name(&self) -> &'static str {
        match self {
            Command::AddTask(_) => ADD_TASK,
            Command::UpdateTask { .. } => UPDATE_TASK,
            Command::CompleteTask { .. } => COMPLETE_TASK,
            Command::RemoveTask { .. } => REMOVE_TASK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall::function("call_1", name, args)
    }

    #[test]
    fn test_decode_add_task_minimal() {
        let cmd = Command::decode(&call(ADD_TASK, r#"{"name":"Buy milk"}"#)).unwrap();
        assert_eq!(cmd, Command::AddTask(NewTask::named("Buy milk")));
    }

    #[test]
    fn test_decode_add_task_full() {
        let cmd = Command::decode(&call(
            ADD_TASK,
            r#"{"name":"Do my taxes","priority":1,"completed":false}"#,
        ))
        .unwrap();
        match cmd {
            Command::AddTask(task) => {
                assert_eq!(task.priority, Some(1));
                assert_eq!(task.completed, Some(false));
                assert_eq!(task.deleted, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_decode_update_task() {
        let cmd = Command::decode(&call(
            UPDATE_TASK,
            r#"{"id":"t1","updates":{"priority":3}}"#,
        ))
        .unwrap();
        assert_eq!(
            cmd,
            Command::UpdateTask {
                id: "t1".to_string(),
                updates: TaskUpdate {
                    priority: Some(3),
                    ..TaskUpdate::default()
                },
            }
        );
    }

    #[test]
    fn test_decode_complete_and_remove() {
        assert_eq!(
            Command::decode(&call(COMPLETE_TASK, r#"{"id":"t1"}"#)).unwrap(),
            Command::CompleteTask { id: "t1".to_string() }
        );
        assert_eq!(
            Command::decode(&call(REMOVE_TASK, r#"{"id":"t2"}"#)).unwrap(),
            Command::RemoveTask { id: "t2".to_string() }
        );
    }

    #[test]
    fn test_decode_is_deterministic() {
        let c = call(ADD_TASK, r#"{"name":"Gym","priority":2}"#);
        assert_eq!(Command::decode(&c).unwrap(), Command::decode(&c).unwrap());
    }

    #[test]
    fn test_malformed_json() {
        let err = Command::decode(&call(ADD_TASK, r#"{"name": "#)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidArguments { ref function, .. } if function == ADD_TASK));
    }

    #[test]
    fn test_missing_required_field() {
        let err = Command::decode(&call(COMPLETE_TASK, "{}")).unwrap_err();
        match err {
            DecodeError::InvalidArguments { reason, .. } => assert!(reason.contains("id")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(Command::decode(&call(UPDATE_TASK, r#"{"id":"t1"}"#)).is_err());
    }

    #[test]
    fn test_unknown_function() {
        let err = Command::decode(&call("getTasks", "{}")).unwrap_err();
        assert_eq!(err, DecodeError::UnknownFunction("getTasks".to_string()));
    }

    #[test]
    fn test_function_name_matches_decode() {
        let cmd = Command::decode(&call(REMOVE_TASK, r#"{"id":"x"}"#)).unwrap();
        assert_eq!(cmd.function_name(), REMOVE_TASK);
    }
}
