// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Memoria engine and its adapters.

use thiserror::Error;

/// The primary error type used across all Memoria adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MemoriaError {
    /// Configuration errors (invalid TOML, missing required fields, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat-completion transport errors (unreachable endpoint, non-success status).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Memory store errors (unreachable store, non-success status, bad payload).
    #[error("store error: {message}")]
    Store {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model output could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MemoriaError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        MemoriaError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a store error without an underlying source.
    pub fn store(message: impl Into<String>) -> Self {
        MemoriaError::Store {
            message: message.into(),
            source: None,
        }
    }
}
