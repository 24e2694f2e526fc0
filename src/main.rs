//! TaskBee - 自然语言任务助手
//!
//! 入口：初始化日志、加载配置、打开任务库，按子命令执行一轮对话 / 输出工具描述 / 列出任务。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use taskbee::{
    actions::tools_json,
    assistant::{AssistantApi, OpenAiAssistant},
    config::{load_config, AppConfig},
    core::{ensure_assistant, ActionOutcome, TurnOrchestrator, DEFAULT_USER_MESSAGE},
    observability,
    store::{SqliteTaskStore, TaskStore},
};

/// 用自然语言管理任务列表
#[derive(Parser, Debug)]
#[command(name = "taskbee", version, about, long_about = None)]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug, Default, PartialEq, Eq)]
struct RunArgs {
    /// 运行前清空任务库
    #[arg(short = 't', long = "truncate")]
    truncate: bool,

    /// 发送给 Assistant 的用户消息
    #[arg(short = 'm', long = "message")]
    message: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// 发送一条消息并应用 Assistant 请求的任务变更（默认）
    Run(RunArgs),
    /// 输出任务函数的工具描述 JSON
    Tools,
    /// 列出任务库中的任务
    List {
        /// 只列出未完成的任务
        #[arg(long)]
        pending: bool,
    },
}

impl Cli {
    /// 归并顶层与 run 子命令的参数；顶层 -t/-m 只能搭配 run（或省略子命令）
    fn into_command(self) -> Result<Commands, clap::Error> {
        let top = self.run;
        match self.command {
            None => Ok(Commands::Run(top)),
            Some(Commands::Run(args)) => Ok(Commands::Run(RunArgs {
                truncate: top.truncate || args.truncate,
                message: args.message.or(top.message),
            })),
            Some(other) if top == RunArgs::default() => Ok(other),
            Some(_) => Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                "--truncate/--message only apply to the run command",
            )),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let command = cli.into_command().unwrap_or_else(|e| e.exit());
    let cfg = load_config(config_path).context("Failed to load config")?;

    match command {
        Commands::Tools => {
            println!("{}", tools_json());
            Ok(())
        }
        Commands::List { pending } => list_tasks(&cfg, pending).await,
        Commands::Run(args) => run_turn(&cfg, args).await,
    }
}

fn open_store(cfg: &AppConfig) -> anyhow::Result<Arc<SqliteTaskStore>> {
    let store = SqliteTaskStore::open(&cfg.store.path)
        .with_context(|| format!("Failed to open task store {}", cfg.store.path.display()))?;
    Ok(Arc::new(store))
}

async fn list_tasks(cfg: &AppConfig, pending: bool) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let tasks = store.list(pending).await.context("Failed to list tasks")?;
    for task in tasks {
        let mark = if task.deleted {
            "deleted"
        } else if task.completed {
            "done"
        } else {
            "pending"
        };
        println!("[P{}] {:<8} {}  ({})", task.priority, mark, task.name, task.id);
    }
    Ok(())
}

async fn run_turn(cfg: &AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let store = open_store(cfg)?;

    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let api = Arc::new(
        OpenAiAssistant::new(
            cfg.assistant.base_url.as_deref(),
            &api_key,
            cfg.assistant.request_timeout_secs,
        )
        .context("Failed to build HTTP client")?,
    );

    let assistant_id = ensure_assistant(api.as_ref(), &cfg.assistant)
        .await
        .context("Failed to provision assistant")?;
    let thread_id = api.create_thread().await.context("Failed to create thread")?;

    let message = args
        .message
        .or_else(|| cfg.app.default_message.clone())
        .unwrap_or_else(|| DEFAULT_USER_MESSAGE.to_string());

    let orchestrator = TurnOrchestrator::new(api, store, assistant_id, cfg.poll.policy())
        .with_submit_tool_outputs(cfg.app.submit_tool_outputs)
        .with_truncate(args.truncate);

    let report = orchestrator
        .run_turn(&thread_id, &message)
        .await
        .context("Turn failed")?;

    if report.actions.is_empty() {
        println!("No actions required (run {} {}).", report.run_id, report.status);
    }
    for action in &report.actions {
        match &action.outcome {
            ActionOutcome::Applied(outcome) => {
                let task = outcome.task();
                println!("✓ {} -> {} ({})", action.function, task.name, task.id);
            }
            ActionOutcome::DecodeFailed(e) => println!("✗ {}: {}", action.function, e),
            ActionOutcome::DispatchFailed(e) => println!("✗ {}: {}", action.function, e),
        }
    }
    if let Some(e) = &report.submit_error {
        println!("! tool outputs not submitted: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<(Option<PathBuf>, Commands), clap::Error> {
        let cli = Cli::try_parse_from(args)?;
        let config = cli.config.clone();
        Ok((config, cli.into_command()?))
    }

    #[test]
    fn test_config_before_subcommand() {
        let (config, command) = parse(&["taskbee", "-c", "x.toml", "list"]).unwrap();
        assert_eq!(config, Some(PathBuf::from("x.toml")));
        assert_eq!(command, Commands::List { pending: false });

        let (config, command) = parse(&["taskbee", "--config", "x.toml", "tools"]).unwrap();
        assert_eq!(config, Some(PathBuf::from("x.toml")));
        assert_eq!(command, Commands::Tools);
    }

    #[test]
    fn test_config_after_subcommand() {
        let (config, command) = parse(&["taskbee", "list", "--pending", "-c", "x.toml"]).unwrap();
        assert_eq!(config, Some(PathBuf::from("x.toml")));
        assert_eq!(command, Commands::List { pending: true });
    }

    #[test]
    fn test_run_is_default() {
        let (config, command) = parse(&["taskbee", "-c", "x.toml", "-t", "-m", "hi"]).unwrap();
        assert_eq!(config, Some(PathBuf::from("x.toml")));
        assert_eq!(
            command,
            Commands::Run(RunArgs {
                truncate: true,
                message: Some("hi".to_string()),
            })
        );

        let (_, command) = parse(&["taskbee"]).unwrap();
        assert_eq!(command, Commands::Run(RunArgs::default()));
    }

    #[test]
    fn test_run_subcommand_merges_top_level_flags() {
        let (_, command) = parse(&["taskbee", "-c", "x.toml", "-t", "run", "-m", "hi"]).unwrap();
        assert_eq!(
            command,
            Commands::Run(RunArgs {
                truncate: true,
                message: Some("hi".to_string()),
            })
        );
    }

    #[test]
    fn test_run_flags_rejected_with_other_subcommands() {
        let err = parse(&["taskbee", "-t", "list"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = parse(&["taskbee", "-m", "hi", "tools"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }
}
