// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as ranges and non-empty endpoints.

use crate::diagnostic::ConfigError;
use crate::model::MemoriaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// every collected validation error (does not fail fast).
///
/// An unknown `memory.timezone` is deliberately accepted: timestamps fall
/// back to UTC at write time.
pub fn validate_config(config: &MemoriaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let threshold = config.memory.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        fail(format!(
            "memory.similarity_threshold must be between 0.0 and 1.0, got {threshold}"
        ));
    }

    if config.memory.summarize_after_n_memories == 0 {
        fail("memory.summarize_after_n_memories must be at least 1".to_string());
    }

    if config.memory.retrieval_k == 0 {
        fail("memory.retrieval_k must be at least 1".to_string());
    }

    if config.memory.messages_to_consider == 0 {
        fail("memory.messages_to_consider must be at least 1".to_string());
    }

    let temperature = config.provider.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        fail(format!(
            "provider.temperature must be between 0.0 and 2.0, got {temperature}"
        ));
    }

    for (key, value) in [
        ("provider.api_url", &config.provider.api_url),
        ("provider.model", &config.provider.model),
        ("store.base_url", &config.store.base_url),
    ] {
        if value.trim().is_empty() {
            fail(format!("{key} must not be empty"));
        }
    }

    for (key, value) in [
        ("provider.api_url", &config.provider.api_url),
        ("store.base_url", &config.store.base_url),
    ] {
        let value = value.trim();
        if !value.is_empty() && !(value.starts_with("http://") || value.starts_with("https://")) {
            fail(format!("{key} `{value}` must start with http:// or https://"));
        }
    }

    if config.background.task_timeout_secs == 0 {
        fail("background.task_timeout_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
