// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector memory store capability.

use async_trait::async_trait;

use crate::error::MemoriaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{StoredMemory, UserId};

/// Per-user vector memory store.
///
/// The store owns identity: `add` returns the id it assigned, and the engine
/// never invents ids of its own. Embedding and nearest-neighbour search are
/// entirely the store's business.
#[async_trait]
pub trait MemoryStore: PluginAdapter {
    /// Persist `text` for `user` and return the store-assigned id.
    async fn add(&self, user: &UserId, text: &str) -> Result<String, MemoriaError>;

    /// Return up to `k` records nearest to `text`, nearest first.
    async fn query(
        &self,
        user: &UserId,
        text: &str,
        k: usize,
    ) -> Result<Vec<StoredMemory>, MemoriaError>;

    /// Delete the record `id`. Deleting a missing id is not an error.
    async fn delete(&self, user: &UserId, id: &str) -> Result<(), MemoriaError>;
}
