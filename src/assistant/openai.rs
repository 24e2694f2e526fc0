//! OpenAI Assistants v2 HTTP 客户端
//!
//! 通过 reqwest 直接调用 `/assistants`、`/threads`、`/threads/{id}/messages`、`/threads/{id}/runs`；
//! base_url 可配置（代理或测试用 Mock 服务器）。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::traits::{ApiError, AssistantApi};
use super::types::{AssistantSpec, Run, ToolOutput};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Deserialize)]
struct IdObject {
    id: String,
}

/// HTTP 客户端：持有 reqwest Client、base_url 与 API Key
pub struct OpenAiAssistant {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiAssistant {
    /// 构建带超时与 `openai-beta` 头的客户端；TLS 后端初始化失败等返回 ApiError::Client
    pub fn new(base_url: Option<&str>, api_key: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("openai-beta", HeaderValue::from_static("assistants=v2"));
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let resp = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistant {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ApiError> {
        let body = json!({
            "name": spec.name,
            "model": spec.model,
            "instructions": spec.instructions,
            "tools": spec.tools,
        });
        let created: IdObject = self
            .send(self.client.post(self.url("/assistants")).json(&body))
            .await?;
        tracing::info!(assistant_id = %created.id, name = %spec.name, "Created assistant");
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String, ApiError> {
        let created: IdObject = self
            .send(self.client.post(self.url("/threads")).json(&json!({})))
            .await?;
        tracing::info!(thread_id = %created.id, "Created thread");
        Ok(created.id)
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<String, ApiError> {
        let body = json!({ "role": "user", "content": content });
        let created: IdObject = self
            .send(
                self.client
                    .post(self.url(&format!("/threads/{thread_id}/messages")))
                    .json(&body),
            )
            .await?;
        Ok(created.id)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        instructions: &str,
    ) -> Result<Run, ApiError> {
        let body = json!({
            "assistant_id": assistant_id,
            "instructions": instructions,
        });
        self.send(
            self.client
                .post(self.url(&format!("/threads/{thread_id}/runs")))
                .json(&body),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ApiError> {
        self.send(
            self.client
                .get(self.url(&format!("/threads/{thread_id}/runs/{run_id}"))),
        )
        .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ApiError> {
        let body = json!({ "tool_outputs": outputs });
        self.send(
            self.client
                .post(self.url(&format!(
                    "/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"
                )))
                .json(&body),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::RunStatus;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_thread_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("openai-beta", "assistants=v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/messages"))
            .and(body_partial_json(json!({"role": "user", "content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
            .mount(&server)
            .await;

        let api = OpenAiAssistant::new(Some(&server.uri()), "sk-test", 5).unwrap();
        assert_eq!(api.create_thread().await.unwrap(), "thread_1");
        assert_eq!(api.create_message("thread_1", "hello").await.unwrap(), "msg_1");
    }

    #[tokio::test]
    async fn test_create_run_sends_instructions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .and(body_partial_json(json!({"assistant_id": "asst_1", "instructions": "ctx"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1", "thread_id": "thread_1", "status": "queued"
            })))
            .mount(&server)
            .await;

        let api = OpenAiAssistant::new(Some(&server.uri()), "sk-test", 5).unwrap();
        let run = api.create_run("thread_1", "asst_1", "ctx").await.unwrap();
        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Queued);
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads/t/runs/r"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let api = OpenAiAssistant::new(Some(&server.uri()), "sk-test", 5).unwrap();
        let err = api.retrieve_run("t", "r").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ApiError::Status { status: 503, .. }));

        let err = api.create_thread().await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads/t/runs/r"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = OpenAiAssistant::new(Some(&server.uri()), "sk-test", 5).unwrap();
        let err = api.retrieve_run("t", "r").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_request_timeout_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/threads/t/runs/r"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "r", "thread_id": "t", "status": "queued"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let api = OpenAiAssistant::new(Some(&server.uri()), "sk-test", 1).unwrap();
        let err = api.retrieve_run("t", "r").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.is_retryable());
    }
}
