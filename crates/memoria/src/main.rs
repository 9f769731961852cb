// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoria - fact-memory consolidation engine for chat assistants.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod process;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memoria_config::model::MemoriaConfig;
use memoria_core::MemoriaError;
use tracing::error;

/// Memoria - remember durable facts about your users.
#[derive(Parser, Debug)]
#[command(name = "memoria", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process one finished conversation turn.
    Process {
        /// User the memories belong to.
        #[arg(long)]
        user: String,
        /// JSON body with a `messages` array. Reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Run a retroactive audit batch instead of the turn pipeline.
        #[arg(long)]
        audit: bool,
    },
    /// Run one retroactive audit batch in the foreground.
    Audit {
        /// User whose memories are audited.
        #[arg(long)]
        user: String,
        /// Memories reviewed in this batch. Defaults to `memory.audit_batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Check configuration and connectivity.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration with secrets masked.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => memoria_config::load_and_validate_path(path),
        None => memoria_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            memoria_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);
    memoria_engine::register_metrics();

    let result = match cli.command {
        Commands::Process { user, input, audit } => {
            process::run_process(&config, &user, input.as_deref(), audit).await
        }
        Commands::Audit { user, batch_size } => {
            let batch_size = batch_size.unwrap_or(config.memory.audit_batch_size);
            process::run_audit(&config, &user, batch_size).await
        }
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("memoria: {e}");
        std::process::exit(1);
    }
}

/// Print the effective configuration as TOML with credentials masked.
fn print_config(config: &MemoriaConfig) -> Result<(), MemoriaError> {
    let rendered = toml::to_string_pretty(&config.redacted())
        .map_err(|e| MemoriaError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("memoria={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
