// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Memoria integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests without
//! a model endpoint or an Open WebUI instance.
//!
//! # Components
//!
//! - [`MockChatProvider`] - scripted chat replies with call recording
//! - [`InMemoryStore`] - per-user memory store with scripted queries and call log
//! - [`test_config`] - a configuration suitable for tests

pub mod memory_store;
pub mod mock_provider;

pub use memory_store::{InMemoryStore, StoreCall};
pub use mock_provider::MockChatProvider;

use memoria_config::model::MemoriaConfig;

/// Default configuration with a store token set and the consolidation
/// period lowered to 3 so trigger tests stay short.
pub fn test_config() -> MemoriaConfig {
    let mut config = MemoriaConfig::default();
    config.store.api_key = Some("test-token".to_string());
    config.memory.summarize_after_n_memories = 3;
    config.memory.timezone = "UTC".to_string();
    config.background.task_timeout_secs = 5;
    config.background.shutdown_grace_secs = 1;
    config
}
