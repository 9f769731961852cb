// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat-completions endpoints.
//!
//! Provides [`OpenAiClient`] which handles request construction, bearer
//! authentication and retry of transient errors.

use std::time::Duration;

use memoria_core::MemoriaError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ApiMessage, ChatCompletionRequest, ChatCompletionResponse};

/// HTTP client for chat-completions calls.
///
/// Retries transient status codes (429, 500, 502, 503) up to `max_retries`
/// times; every other non-success status fails immediately.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// `api_key` of `None` sends no Authorization header, which local
    /// OpenAI-compatible servers usually accept.
    pub fn new(
        api_key: Option<&str>,
        api_url: String,
        model: String,
        temperature: f32,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, MemoriaError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                    MemoriaError::Config(format!("invalid API key header value: {e}"))
                })?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MemoriaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_url,
            model,
            temperature,
            max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Returns the model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Overrides the delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Builds the request body for one system + user prompt pair.
    pub fn build_request(&self, system_prompt: &str, user_prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ApiMessage {
                    role: "system".into(),
                    content: system_prompt.to_string(),
                },
                ApiMessage {
                    role: "user".into(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            stream: false,
        }
    }

    /// Sends a non-streaming request and returns the trimmed reply text.
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<String, MemoriaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .json(request)
                .send()
                .await
                .map_err(|e| MemoriaError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| MemoriaError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: ChatCompletionResponse =
                    serde_json::from_str(&body).map_err(|e| MemoriaError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return parsed
                    .first_text()
                    .ok_or_else(|| MemoriaError::provider("API response contained no message content"));
            }

            let body = response.text().await.unwrap_or_default();

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(MemoriaError::provider(format!("API returned {status}: {body}")));
                continue;
            }

            let error_msg = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "chat API error ({}, {}): {}",
                    status,
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(MemoriaError::provider(error_msg));
        }

        Err(last_error
            .unwrap_or_else(|| MemoriaError::provider("completion request failed after retries")))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/v1/chat/completions";

    fn test_client(server: &MockServer, max_retries: u32) -> OpenAiClient {
        OpenAiClient::new(
            Some("test-api-key"),
            format!("{}{ENDPOINT}", server.uri()),
            "gpt-4o-mini".into(),
            0.0,
            Duration::from_secs(5),
            max_retries,
        )
        .unwrap()
        .with_retry_delay(Duration::from_millis(10))
    }

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        })
    }

    #[tokio::test]
    async fn complete_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("  update \n")))
            .mount(&server)
            .await;

        let client = test_client(&server, 1);
        let text = client.complete(&client.build_request("sys", "user")).await.unwrap();
        assert_eq!(text, "update");
    }

    #[tokio::test]
    async fn sends_bearer_and_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("authorization", "Bearer test-api-key"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server, 0);
        let result = client.complete(&client.build_request("be terse", "hello")).await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "slow down"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("after retry")))
            .mount(&server)
            .await;

        let client = test_client(&server, 1);
        let text = client.complete(&client.build_request("s", "u")).await.unwrap();
        assert_eq!(text, "after retry");
    }

    #[tokio::test]
    async fn fails_immediately_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Incorrect API key"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server, 3);
        let err = client
            .complete(&client.build_request("s", "u"))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("Incorrect API key"), "got: {err}");
        assert!(err.contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn exhausts_retries_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server, 1);
        let err = client
            .complete(&client.build_request("s", "u"))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("503"), "got: {err}");
    }

    #[tokio::test]
    async fn malformed_success_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server, 0);
        let err = client.complete(&client.build_request("s", "u")).await.unwrap_err();
        assert!(matches!(err, MemoriaError::Provider { .. }));
    }

    #[test]
    fn transient_status_codes() {
        assert!(is_transient_error(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_error(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_error(reqwest::StatusCode::BAD_REQUEST));
        assert!(!is_transient_error(reqwest::StatusCode::UNAUTHORIZED));
    }
}
