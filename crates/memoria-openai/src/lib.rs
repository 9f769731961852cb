// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completions adapter for Memoria.
//!
//! This crate implements [`ChatProvider`] against any endpoint speaking the
//! OpenAI chat-completions protocol (OpenAI, Ollama, vLLM, LiteLLM, ...).

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use memoria_config::model::ProviderConfig;
use memoria_core::error::MemoriaError;
use memoria_core::traits::{ChatProvider, PluginAdapter};
use memoria_core::types::{AdapterType, HealthStatus};
use tracing::info;

use crate::client::OpenAiClient;

/// Chat-completions provider implementing [`ChatProvider`].
///
/// API key resolution order: `provider.api_key` -> `OPENAI_API_KEY` env var
/// -> no Authorization header.
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a new provider from the `[provider]` config section.
    pub fn new(config: &ProviderConfig) -> Result<Self, MemoriaError> {
        let api_key = resolve_api_key(config.api_key.as_deref());
        let client = OpenAiClient::new(
            api_key.as_deref(),
            config.api_url.clone(),
            config.model.clone(),
            config.temperature,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;

        info!(model = config.model, url = config.api_url, "chat provider initialized");

        Ok(Self { client })
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }
}

/// Pick the configured key, else `OPENAI_API_KEY`; empty strings count as unset.
fn resolve_api_key(configured: Option<&str>) -> Option<String> {
    configured
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()))
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    /// Issues a one-token probe completion.
    async fn health_check(&self) -> Result<HealthStatus, MemoriaError> {
        let request = self.client.build_request("Reply with OK.", "ping");
        match self.client.complete(&request).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, MemoriaError> {
        let request = self.client.build_request(system_prompt, user_prompt);
        self.client.complete(&request).await
    }
}
