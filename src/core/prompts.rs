//! 提示词：Assistant 使命说明、用户消息包装、Run 附加指令（任务快照 + 不得重复）
//!
//! 使命说明优先读取 config/prompts/assistant.txt，找不到时使用内置文本。

use crate::store::Task;

const MISSION_STATEMENT: &str = "\
You are an expert task planning assistant who helps people organize the tasks in the various parts of their lives.
Human users will chat with you to keep track of their tasks, each of which can be given a priority and a status of completed or not.
You will need to keep track of the tasks and their attributes in order to respond to the user's requests.
Assume that the user might just be giving you a list of items to create. Unless a multi-line or comma-separated list is given, assume that each new line or element is a new Task to create.
They could also be asking you to update an existing item.
If the user indicates a priority, please translate this to the priority number, where 1 means top priority and 3 means bottom priority. If they did not give one, assume priority 2.
Do not ask for the current tasks; use the tasks provided with each run.";

/// 未指定 --message 时发送的默认用户消息
pub const DEFAULT_USER_MESSAGE: &str =
    "I need to go buy bread from the store, then go to the gym. I also need to do my taxes, which is a P1.";

pub fn mission_statement() -> String {
    [
        "config/prompts/assistant.txt",
        "../config/prompts/assistant.txt",
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .unwrap_or_else(|| MISSION_STATEMENT.to_string())
}

/// 追加到线程的用户消息内容
pub fn user_message_content(user_message: &str) -> String {
    format!(
        "This is the message the user just sent:\n\n{user_message}\n\n\
         Please use the functions provided to update the tasks as appropriate.\n\
         If the user says they have already done a task that you recognize in the users tasks, \
         call the function to mark it completed."
    )
}

/// Run 的附加指令：嵌入任务快照（JSON）与「不要重复创建」约束
pub fn run_instructions(tasks: &[Task]) -> String {
    let snapshot = serde_json::to_string(tasks).unwrap_or_else(|_| "[]".to_string());
    format!(
        "These are the tasks that the user already has: {snapshot}. \
         Please update them as appropriate, do not make duplicates."
    )
}
