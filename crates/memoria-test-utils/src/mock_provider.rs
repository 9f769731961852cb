// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat provider for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use memoria_core::MemoriaError;
use memoria_core::traits::{ChatProvider, PluginAdapter};
use memoria_core::types::{AdapterType, HealthStatus};

/// Reply the mock gives once its queue is drained. Parses as an empty fact
/// list, an empty audit verdict, and contains no classifier keyword.
pub const DEFAULT_REPLY: &str = "[]";

/// A chat provider that returns pre-configured replies.
///
/// Replies are popped from a FIFO queue; an `Err` entry fails that call with
/// a provider error. Every prompt pair is recorded.
#[derive(Clone, Default)]
pub struct MockChatProvider {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    delay: Option<Duration>,
}

impl MockChatProvider {
    /// Create a mock with an empty reply queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock pre-loaded with successful replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(|r| Ok(r.into())).collect(),
            )),
            ..Self::default()
        }
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful reply.
    pub async fn push_reply(&self, text: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a transport failure.
    pub async fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Err(message.into()));
    }

    /// Number of `chat` calls made so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Recorded `(system_prompt, user_prompt)` pairs, oldest first.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockChatProvider {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MemoriaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, MemoriaError> {
        self.calls
            .lock()
            .await
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().await.pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(MemoriaError::provider(message)),
            None => Ok(DEFAULT_REPLY.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_pop_in_order_then_default() {
        let mock = MockChatProvider::with_replies(["one", "two"]);
        assert_eq!(mock.chat("s", "u").await.unwrap(), "one");
        assert_eq!(mock.chat("s", "u").await.unwrap(), "two");
        assert_eq!(mock.chat("s", "u").await.unwrap(), DEFAULT_REPLY);
        assert_eq!(mock.call_count().await, 3);
    }

    #[tokio::test]
    async fn queued_error_fails_one_call() {
        let mock = MockChatProvider::new();
        mock.push_error("down").await;
        mock.push_reply("up").await;

        let err = mock.chat("s", "u").await.unwrap_err();
        assert!(matches!(err, MemoriaError::Provider { .. }));
        assert_eq!(mock.chat("s", "u").await.unwrap(), "up");
    }

    #[tokio::test]
    async fn records_prompts() {
        let mock = MockChatProvider::new();
        mock.chat("system", "user").await.unwrap();
        assert_eq!(
            mock.calls().await,
            vec![("system".to_string(), "user".to_string())]
        );
    }
}
