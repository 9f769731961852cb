// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction from the recent conversation.
//!
//! Never fails: transport errors and unparseable replies both yield an
//! empty fact list, so a bad model response costs one turn's memories and
//! nothing else.

use std::sync::Arc;

use memoria_core::traits::ChatProvider;
use memoria_core::types::{ChatMessage, Role};
use tracing::{debug, warn};

use crate::prompts::EXTRACTION_PROMPT;

/// Turns a conversation window into atomic facts about the user.
pub struct FactExtractor {
    provider: Arc<dyn ChatProvider>,
    messages_to_consider: usize,
    context_pair_only: bool,
}

impl FactExtractor {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        messages_to_consider: usize,
        context_pair_only: bool,
    ) -> Self {
        Self {
            provider,
            messages_to_consider,
            context_pair_only,
        }
    }

    /// Extract facts from the tail of `messages`.
    ///
    /// Returns an empty list without calling the model when the selected
    /// window holds no user message.
    pub async fn extract(&self, messages: &[ChatMessage]) -> Vec<String> {
        let window = select_window(messages, self.messages_to_consider, self.context_pair_only);
        if !window.iter().any(|m| m.role == Role::User) {
            debug!("no user message in window, skipping extraction");
            return Vec::new();
        }

        let conversation = render_conversation(&window);
        match self.provider.chat(EXTRACTION_PROMPT, &conversation).await {
            Ok(reply) => {
                let facts = parse_string_array(&reply);
                debug!(count = facts.len(), "facts extracted");
                facts
            }
            Err(e) => {
                warn!(error = %e, "fact extraction call failed");
                Vec::new()
            }
        }
    }
}

/// Pick the messages shown to the extraction model.
///
/// Window mode keeps the last `n`. Context-pair mode keeps the last user
/// message plus the assistant message right before it, if there is one.
pub fn select_window(messages: &[ChatMessage], n: usize, context_pair_only: bool) -> Vec<&ChatMessage> {
    if !context_pair_only {
        let start = messages.len().saturating_sub(n);
        return messages[start..].iter().collect();
    }

    let Some(last_user) = messages.iter().rposition(|m| m.role == Role::User) else {
        return Vec::new();
    };

    let mut window = Vec::with_capacity(2);
    if let Some(prev) = last_user.checked_sub(1).map(|i| &messages[i]) {
        if prev.role == Role::Assistant {
            window.push(prev);
        }
    }
    window.push(&messages[last_user]);
    window
}

/// Serialize messages as `role: content` lines.
pub fn render_conversation(window: &[&ChatMessage]) -> String {
    window
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a JSON array of strings out of a model reply.
///
/// Tolerates a surrounding code fence and prose around the array. Each `[`
/// is tried in turn as the array start, up to the last `]`, so bracketed
/// prose ahead of the array is skipped. Non-string elements and blank
/// strings are dropped; anything unparseable yields an empty list.
pub fn parse_string_array(reply: &str) -> Vec<String> {
    let trimmed = strip_code_fence(reply.trim());
    let Some(close) = trimmed.rfind(']') else {
        warn!("model reply contains no JSON array");
        debug!(reply, "raw reply");
        return Vec::new();
    };

    let mut last_err = None;
    for (open, _) in trimmed[..close].match_indices('[') {
        match serde_json::from_str::<Vec<serde_json::Value>>(&trimmed[open..=close]) {
            Ok(values) => return string_values(values),
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) => warn!(error = %e, "failed to parse model reply as JSON array"),
        None => warn!("model reply contains no JSON array"),
    }
    debug!(reply, "raw reply");
    Vec::new()
}

fn string_values(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            _ => None,
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) up to the first newline.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
