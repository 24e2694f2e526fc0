//! TaskBee - 自然语言任务助手
//!
//! 模块划分：
//! - **actions**: 工具调用解码（Command）、命令分发、工具描述生成
//! - **assistant**: 远端 Assistant 抽象与实现（OpenAI HTTP / Scripted Mock）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: Run 轮询、单轮编排、错误类型、提示词
//! - **observability**: 日志初始化
//! - **store**: Task 模型与存储（内存 / SQLite）

pub mod actions;
pub mod assistant;
pub mod config;
pub mod core;
pub mod observability;
pub mod store;

pub use crate::core::{TurnOrchestrator, TurnReport};
