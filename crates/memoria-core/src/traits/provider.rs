// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-completion capability used by every LLM-backed component.

use async_trait::async_trait;

use crate::error::MemoriaError;
use crate::traits::adapter::PluginAdapter;

/// Sends one system + user prompt pair and returns the model's reply text.
///
/// Implementations fail with [`MemoriaError::Provider`] on transport errors
/// and non-success HTTP status codes.
#[async_trait]
pub trait ChatProvider: PluginAdapter {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, MemoriaError>;
}
