// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `memoria process` and `memoria audit` command implementations.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use memoria_config::model::MemoriaConfig;
use memoria_core::MemoriaError;
use memoria_core::types::{ChatMessage, Role, UserId};
use memoria_engine::{MemoryPipeline, TaskSupervisor};
use memoria_openai::OpenAiProvider;
use memoria_openwebui::OpenWebUiStore;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::shutdown::install_signal_handler;

/// Request body as an Open WebUI filter receives it.
#[derive(Debug, Deserialize)]
struct TurnBody {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    role: String,
    #[serde(default)]
    content: serde_json::Value,
}

/// Parse a turn body into chat messages.
///
/// Messages with an unknown role are dropped. Multi-part content keeps its
/// text parts only.
pub fn parse_turn_body(raw: &str) -> Result<Vec<ChatMessage>, MemoriaError> {
    let body: TurnBody = serde_json::from_str(raw)
        .map_err(|e| MemoriaError::Parse(format!("invalid turn body: {e}")))?;

    Ok(body
        .messages
        .into_iter()
        .filter_map(|m| {
            let Ok(role) = Role::from_str(&m.role) else {
                debug!(role = m.role, "dropping message with unknown role");
                return None;
            };
            Some(ChatMessage {
                role,
                content: content_text(&m.content),
            })
        })
        .collect())
}

fn content_text(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(serde_json::Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

async fn read_input(input: Option<&Path>) -> Result<String, MemoriaError> {
    let mut raw = String::new();
    match input {
        Some(path) => {
            raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                MemoriaError::Internal(format!("failed to read {}: {e}", path.display()))
            })?;
        }
        None => {
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .map_err(|e| MemoriaError::Internal(format!("failed to read stdin: {e}")))?;
        }
    }
    Ok(raw)
}

fn build_pipeline(config: &MemoriaConfig) -> Result<MemoryPipeline, MemoriaError> {
    let provider = Arc::new(OpenAiProvider::new(&config.provider)?);
    let store = Arc::new(OpenWebUiStore::new(&config.store)?);
    let supervisor = Arc::new(TaskSupervisor::with_token(
        install_signal_handler(),
        Duration::from_secs(config.background.task_timeout_secs),
    ));
    Ok(MemoryPipeline::new(config, provider, store, supervisor))
}

/// Run one turn and wait for any background task it started.
pub async fn run_process(
    config: &MemoriaConfig,
    user: &str,
    input: Option<&Path>,
    audit: bool,
) -> Result<(), MemoriaError> {
    let messages = parse_turn_body(&read_input(input).await?)?;

    let mut config = config.clone();
    if audit {
        config.memory.audit_mode = true;
    }
    let pipeline = build_pipeline(&config)?;

    let user = UserId::from(user);
    let outcome = pipeline.process_turn(Some(&user), &messages).await;
    if config.memory.show_stats {
        println!("{}", outcome.status_line());
    } else {
        println!("memory: {}", outcome.message());
    }

    let grace = Duration::from_secs(config.background.shutdown_grace_secs);
    let aborted = pipeline.supervisor().drain(grace).await;
    if aborted > 0 {
        warn!(aborted, "background tasks aborted at exit");
    }
    Ok(())
}

/// Run one audit batch in the foreground and print the result.
pub async fn run_audit(
    config: &MemoriaConfig,
    user: &str,
    batch_size: usize,
) -> Result<(), MemoriaError> {
    let pipeline = build_pipeline(config)?;
    let user = UserId::from(user);
    let cancel = pipeline.supervisor().cancellation_token();

    let report = tokio::select! {
        report = pipeline.run_audit(&user, batch_size) => report?,
        _ = cancel.cancelled() => return Err(MemoriaError::Cancelled),
    };

    info!(user = %user, deleted = report.deleted, "audit finished");
    println!(
        "audit: reviewed {}, flagged {}, deleted {}, ignored {}",
        report.reviewed, report.flagged, report.deleted, report.ignored
    );
    Ok(())
}
