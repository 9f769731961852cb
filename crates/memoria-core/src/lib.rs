// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Memoria fact-memory engine.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the engine and the adapters for its external collaborators
//! (chat-completion endpoint and vector memory store).

pub mod error;
pub mod traits;
pub mod types;

pub use error::MemoriaError;
pub use types::{AdapterType, ChatMessage, HealthStatus, Role, StoredMemory, UserId};

pub use traits::{ChatProvider, MemoryStore, PluginAdapter};
