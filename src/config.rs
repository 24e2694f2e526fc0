//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TASKBEE__*` 覆盖（双下划线表示嵌套，如 `TASKBEE__POLL__MAX_ATTEMPTS=30`）。
//! API Key 不进配置文件，只从 `OPENAI_API_KEY` 读取。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::PollPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub assistant: AssistantSection,
    pub poll: PollSection,
    pub store: StoreSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    /// 未传 --message 时使用；为空则用内置默认消息
    pub default_message: Option<String>,
    /// Run 停在 requires_action 时，分发后是否回传工具输出
    #[serde(default)]
    pub submit_tool_outputs: bool,
}

/// [assistant] 段：Assistant 名称、模型、端点；assistant_id 已设置时复用而不新建
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantSection {
    #[serde(default = "default_assistant_name")]
    pub name: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    pub assistant_id: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_assistant_name() -> String {
    "Task Planner".to_string()
}

fn default_model() -> String {
    "gpt-4-1106-preview".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            model: default_model(),
            base_url: None,
            assistant_id: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// [poll] 段：Run 轮询间隔（毫秒，指数退避）与次数上限
#[derive(Debug, Clone, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    16000
}

fn default_max_attempts() -> u32 {
    60
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollSection {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// [store] 段：SQLite 文件路径
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("tasks.db")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// 未显式指定配置文件时依次尝试的默认位置（取第一个存在的）
const DEFAULT_CONFIG_FILES: [&str; 3] = ["config/default.toml", "../config/default.toml", "default.toml"];

/// 加载配置：默认文件 → 显式文件（-c）→ 环境变量 TASKBEE__*，后者覆盖前者
///
/// 默认文件缺失时直接用内置默认值；显式指定的文件不存在则报错，不静默退回默认。
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(default_file) = DEFAULT_CONFIG_FILES
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
    {
        tracing::debug!(path = %default_file.display(), "Using default config");
        builder = builder.add_source(config::File::from(default_file));
    }

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(config::ConfigError::NotFound(format!(
                "config file {}",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder
        .add_source(
            config::Environment::with_prefix("TASKBEE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
