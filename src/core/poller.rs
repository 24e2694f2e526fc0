//! Run 轮询器
//!
//! 从创建时的状态出发，反复查询 Run 直到终止：requires_action / completed 返回附带的工具调用（可能为空），
//! failed 类返回 RunError::Failed。轮询之间挂起等待（指数退避，上限 max_delay），
//! 次数用尽返回 RunError::Timeout。轮询器只负责等待，从不分发命令。

use std::sync::Arc;
use std::time::Duration;

use crate::assistant::{AssistantApi, Run, RunPhase, ToolCall};
use crate::core::RunError;

/// 轮询策略；max_delay == initial_delay 时即为固定间隔
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 最多 retrieve 次数
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(16),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            max_attempts,
        }
    }

    /// 第 n 次等待（从 0 起）：initial_delay * 2^n，封顶 max_delay
    pub fn delay_for(&self, wait_index: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis();
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let max_ms = self.max_delay.as_millis().max(base_ms);
        let shift = wait_index.min(20);
        let backoff_ms = base_ms.saturating_mul(1u128 << shift).min(max_ms);
        Duration::from_millis(u64::try_from(backoff_ms).unwrap_or(u64::MAX))
    }
}

pub struct RunPoller {
    api: Arc<dyn AssistantApi>,
    policy: PollPolicy,
}

impl RunPoller {
    pub fn new(api: Arc<dyn AssistantApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// 等到终止并返回工具调用列表（保持远端上报顺序）
    pub async fn wait_for_actions(&self, run: &Run) -> Result<Vec<ToolCall>, RunError> {
        self.wait_for_terminal(run)
            .await
            .map(|finished| finished.tool_calls().to_vec())
    }

    /// 等到终止并返回最终的 Run；首次查询紧随创建，之后每次查询前等待
    pub async fn wait_for_terminal(&self, run: &Run) -> Result<Run, RunError> {
        let mut current = run.clone();
        let mut attempts = 0u32;

        loop {
            match current.status.phase() {
                RunPhase::ActionRequired | RunPhase::Completed => {
                    tracing::info!(
                        run_id = %current.id,
                        status = %current.status,
                        tool_calls = current.tool_calls().len(),
                        "Run finished"
                    );
                    return Ok(current);
                }
                RunPhase::Failed => {
                    tracing::error!(
                        run_id = %current.id,
                        status = %current.status,
                        last_error = ?current.last_error,
                        "Run failed"
                    );
                    return Err(RunError::Failed {
                        run_id: current.id,
                        status: current.status,
                        last_error: current.last_error,
                    });
                }
                RunPhase::Pending => {}
            }

            if attempts >= self.policy.max_attempts {
                tracing::error!(run_id = %run.id, attempts, "Run polling exhausted");
                return Err(RunError::Timeout {
                    run_id: run.id.clone(),
                    attempts,
                });
            }

            if attempts > 0 {
                let delay = self.policy.delay_for(attempts - 1);
                tracing::debug!(
                    run_id = %run.id,
                    delay_ms = delay.as_millis() as u64,
                    "Run pending, trying again"
                );
                tokio::time::sleep(delay).await;
            }
            attempts += 1;

            match self.api.retrieve_run(&run.thread_id, &run.id).await {
                Ok(next) => {
                    tracing::info!(run_id = %run.id, status = %next.status, attempt = attempts, "Polled run");
                    current = next;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(run_id = %run.id, attempt = attempts, error = %e, "Poll failed, will retry");
                }
                Err(e) => {
                    return Err(RunError::Api {
                        run_id: run.id.clone(),
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ApiError, RunStatus, ScriptedAssistant};
    use tokio::time::Instant;

    fn run(status: RunStatus) -> Run {
        Run::new("run_1", "thread_1", status)
    }

    fn poller(api: Arc<ScriptedAssistant>, policy: PollPolicy) -> RunPoller {
        RunPoller::new(api, policy)
    }

    #[test]
    fn test_delay_backoff_is_capped() {
        let policy = PollPolicy {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            max_attempts: 10,
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for(3), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));

        let fixed = PollPolicy::fixed(Duration::from_secs(2), 5);
        assert_eq!(fixed.delay_for(0), fixed.delay_for(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_statuses_poll_again_after_fixed_delay() {
        let api = Arc::new(ScriptedAssistant::new(vec![
            run(RunStatus::Queued),
            run(RunStatus::InProgress),
            run(RunStatus::InProgress),
            run(RunStatus::Completed),
        ]));
        let poller = poller(api.clone(), PollPolicy::fixed(Duration::from_secs(2), 10));

        let start = Instant::now();
        let calls = poller.wait_for_actions(&run(RunStatus::Queued)).await.unwrap();

        assert!(calls.is_empty());
        assert_eq!(api.calls().retrieves, 4);
        // 首次查询不等待，其后三次各等 2s
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requires_action_returns_calls_in_order() {
        let calls = vec![
            ToolCall::function("c1", "addTask", r#"{"name":"A"}"#),
            ToolCall::function("c2", "addTask", r#"{"name":"B"}"#),
            ToolCall::function("c3", "removeTask", r#"{"id":"x"}"#),
        ];
        let api = Arc::new(ScriptedAssistant::new(vec![
            run(RunStatus::InProgress),
            run(RunStatus::RequiresAction).with_tool_calls(calls.clone()),
        ]));
        let got = poller(api, PollPolicy::default())
            .wait_for_actions(&run(RunStatus::Queued))
            .await
            .unwrap();
        assert_eq!(got, calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_keeps_attached_calls() {
        let calls = vec![ToolCall::function("c1", "completeTask", r#"{"id":"t"}"#)];
        let api = Arc::new(ScriptedAssistant::new(vec![
            run(RunStatus::Completed).with_tool_calls(calls.clone()),
        ]));
        let got = poller(api, PollPolicy::default())
            .wait_for_actions(&run(RunStatus::Queued))
            .await
            .unwrap();
        assert_eq!(got, calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_class_statuses_error() {
        for status in [
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Expired,
            RunStatus::Incomplete,
        ] {
            let api = Arc::new(ScriptedAssistant::new(vec![
                run(status).with_last_error("server_error", "boom"),
            ]));
            let err = poller(api, PollPolicy::default())
                .wait_for_actions(&run(RunStatus::Queued))
                .await
                .unwrap_err();
            match err {
                RunError::Failed { status: s, last_error, .. } => {
                    assert_eq!(s, status);
                    assert_eq!(last_error.unwrap().message, "boom");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_keeps_polling_until_cancelled() {
        let api = Arc::new(ScriptedAssistant::new(vec![
            run(RunStatus::Cancelling),
            run(RunStatus::Cancelling),
            run(RunStatus::Cancelled),
        ]));
        let err = poller(api.clone(), PollPolicy::fixed(Duration::from_secs(2), 10))
            .wait_for_actions(&run(RunStatus::InProgress))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Failed {
                status: RunStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(api.calls().retrieves, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_is_polled_again() {
        let api = Arc::new(ScriptedAssistant::new(vec![
            run(RunStatus::Unknown),
            run(RunStatus::Completed),
        ]));
        let got = poller(api.clone(), PollPolicy::fixed(Duration::from_secs(2), 10))
            .wait_for_actions(&run(RunStatus::Queued))
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(api.calls().retrieves, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_at_creation_skips_polling() {
        let api = Arc::new(ScriptedAssistant::new(vec![]));
        let got = poller(api.clone(), PollPolicy::default())
            .wait_for_actions(&run(RunStatus::Completed))
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(api.calls().retrieves, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_terminal_times_out() {
        let api = Arc::new(ScriptedAssistant::new(vec![run(RunStatus::InProgress)]));
        let err = poller(api.clone(), PollPolicy::fixed(Duration::from_secs(2), 5))
            .wait_for_actions(&run(RunStatus::Queued))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RunError::Timeout {
                run_id: "run_1".to_string(),
                attempts: 5
            }
        );
        assert_eq!(api.calls().retrieves, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let api = Arc::new(ScriptedAssistant::with_results(vec![
            Err(ApiError::Transport("connection reset".to_string())),
            Err(ApiError::Status {
                status: 502,
                body: String::new(),
            }),
            Ok(run(RunStatus::Completed)),
        ]));
        let got = poller(api.clone(), PollPolicy::default())
            .wait_for_actions(&run(RunStatus::Queued))
            .await
            .unwrap();
        assert!(got.is_empty());
        assert_eq!(api.calls().retrieves, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_aborts() {
        let api = Arc::new(ScriptedAssistant::with_results(vec![Err(ApiError::Status {
            status: 404,
            body: "no such run".to_string(),
        })]));
        let err = poller(api.clone(), PollPolicy::default())
            .wait_for_actions(&run(RunStatus::Queued))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Api { .. }));
        assert_eq!(api.calls().retrieves, 1);
    }
}
