// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Memoria engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Memoria configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoriaConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Chat-completion endpoint used for extraction, classification and audits.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Memory store endpoint.
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-turn pipeline and audit settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Background consolidation and audit task settings.
    #[serde(default)]
    pub background: BackgroundConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenAI-compatible chat-completions endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Full URL of the chat-completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token. `None` sends no Authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier used for every memory-processing call.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature. Memory processing wants deterministic output.
    #[serde(default)]
    pub temperature: f32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient status codes (429, 500, 502, 503).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_provider_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    1
}

/// Open WebUI memory store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Base URL of the Open WebUI instance.
    #[serde(default = "default_store_url")]
    pub base_url: String,

    /// Default bearer token, used for users without an entry in `user_tokens`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-user bearer tokens, keyed by user id.
    #[serde(default)]
    pub user_tokens: BTreeMap<String, String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            api_key: None,
            user_tokens: BTreeMap::new(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_store_timeout_secs() -> u64 {
    30
}

/// Per-turn pipeline and audit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable the memory engine. When false, turns are skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Number of most recent messages considered for extraction.
    #[serde(default = "default_messages_to_consider")]
    pub messages_to_consider: usize,

    /// Only show the model the last user message and the assistant message
    /// right before it, so assistant statements are not attributed to the user.
    #[serde(default)]
    pub context_pair_only: bool,

    /// IANA time zone used for memory timestamps. Unknown names fall back to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Minimum similarity (1 - distance) for a stored memory to count as related.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Number of neighbours requested from the store per fact.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Schedule a consolidation pass after this many saved facts per user.
    #[serde(default = "default_summarize_after_n_memories")]
    pub summarize_after_n_memories: u32,

    /// Run the retroactive audit instead of the per-turn pipeline.
    #[serde(default)]
    pub audit_mode: bool,

    /// Number of memories reviewed per audit batch. Zero disables audits.
    #[serde(default = "default_audit_batch_size")]
    pub audit_batch_size: usize,

    /// Report elapsed time alongside the memory status line.
    #[serde(default = "default_show_stats")]
    pub show_stats: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            messages_to_consider: default_messages_to_consider(),
            context_pair_only: false,
            timezone: default_timezone(),
            similarity_threshold: default_similarity_threshold(),
            retrieval_k: default_retrieval_k(),
            summarize_after_n_memories: default_summarize_after_n_memories(),
            audit_mode: false,
            audit_batch_size: default_audit_batch_size(),
            show_stats: default_show_stats(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_messages_to_consider() -> usize {
    6
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.75
}

fn default_retrieval_k() -> usize {
    5
}

fn default_summarize_after_n_memories() -> u32 {
    10
}

fn default_audit_batch_size() -> usize {
    50
}

fn default_show_stats() -> bool {
    true
}

/// Background task configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackgroundConfig {
    /// Upper bound on a single consolidation or audit task, in seconds.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Number of memories fetched per consolidation pass.
    #[serde(default = "default_consolidation_batch_size")]
    pub consolidation_batch_size: usize,

    /// How long the CLI waits for in-flight tasks before exiting, in seconds.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            task_timeout_secs: default_task_timeout_secs(),
            consolidation_batch_size: default_consolidation_batch_size(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_task_timeout_secs() -> u64 {
    300
}

fn default_consolidation_batch_size() -> usize {
    50
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl MemoriaConfig {
    /// Copy of this config with every credential replaced by `***`.
    ///
    /// Used when printing the effective configuration.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.provider.api_key.is_some() {
            config.provider.api_key = Some("***".to_string());
        }
        if config.store.api_key.is_some() {
            config.store.api_key = Some("***".to_string());
        }
        for token in config.store.user_tokens.values_mut() {
            *token = "***".to_string();
        }
        config
    }
}
