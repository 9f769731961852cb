// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `memoria doctor` command implementation.
//!
//! Checks the loaded configuration and probes both collaborators: the
//! chat-completions endpoint and the memory store.

use std::io::IsTerminal;
use std::str::FromStr;
use std::time::{Duration, Instant};

use memoria_config::model::MemoriaConfig;
use memoria_core::MemoriaError;
use memoria_core::traits::PluginAdapter;
use memoria_core::types::HealthStatus;
use memoria_openai::OpenAiProvider;
use memoria_openwebui::OpenWebUiStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

/// Run every check and print a report. Fails when any check fails.
pub async fn run_doctor(config: &MemoriaConfig, plain: bool) -> Result<(), MemoriaError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_timezone(&config.memory.timezone),
        check_store_credentials(config),
        check_provider(config).await,
        check_store(config).await,
    ];

    println!();
    println!("  memoria doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", format_result(result, use_color));
    }
    println!();

    let fail_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warn_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();

    if fail_count + warn_count == 0 {
        println!("  All checks passed.");
    } else {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    }
    println!();

    if fail_count > 0 {
        return Err(MemoriaError::Internal(format!(
            "{fail_count} doctor check(s) failed"
        )));
    }
    Ok(())
}

fn format_result(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

fn check_timezone(name: &str) -> CheckResult {
    let start = Instant::now();
    let (status, message) = match chrono_tz::Tz::from_str(name) {
        Ok(_) => (CheckStatus::Pass, name.to_string()),
        Err(_) => (
            CheckStatus::Warn,
            format!("unknown time zone `{name}`, timestamps will use UTC"),
        ),
    };
    CheckResult {
        name: "Time zone".to_string(),
        status,
        message,
        duration: start.elapsed(),
    }
}

fn check_store_credentials(config: &MemoriaConfig) -> CheckResult {
    let start = Instant::now();
    let has_default = config
        .store
        .api_key
        .as_deref()
        .is_some_and(|k| !k.is_empty());
    let users = config.store.user_tokens.len();
    let (status, message) = match (has_default, users) {
        (true, 0) => (CheckStatus::Pass, "default token".to_string()),
        (true, n) => (CheckStatus::Pass, format!("default token + {n} user token(s)")),
        (false, 0) => (
            CheckStatus::Warn,
            "no store token configured; every store call will fail".to_string(),
        ),
        (false, n) => (
            CheckStatus::Pass,
            format!("{n} user token(s), no default"),
        ),
    };
    CheckResult {
        name: "Store credentials".to_string(),
        status,
        message,
        duration: start.elapsed(),
    }
}

async fn check_provider(config: &MemoriaConfig) -> CheckResult {
    let start = Instant::now();
    let status = match OpenAiProvider::new(&config.provider) {
        Ok(provider) => provider.health_check().await,
        Err(e) => Err(e),
    };
    health_result(
        "Chat provider",
        format!("{} ({})", config.provider.model, config.provider.api_url),
        status,
        start,
    )
}

async fn check_store(config: &MemoriaConfig) -> CheckResult {
    let start = Instant::now();
    let status = match OpenWebUiStore::new(&config.store) {
        Ok(store) => store.health_check().await,
        Err(e) => Err(e),
    };
    health_result("Memory store", config.store.base_url.clone(), status, start)
}

fn health_result(
    name: &str,
    target: String,
    status: Result<HealthStatus, MemoriaError>,
    start: Instant,
) -> CheckResult {
    let (status, message) = match status {
        Ok(HealthStatus::Healthy) => (CheckStatus::Pass, target),
        Ok(HealthStatus::Degraded(reason)) => (CheckStatus::Warn, format!("{target}: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => (CheckStatus::Fail, format!("{target}: {reason}")),
        Err(e) => (CheckStatus::Fail, format!("{target}: {e}")),
    };
    CheckResult {
        name: name.to_string(),
        status,
        message,
        duration: start.elapsed(),
    }
}
