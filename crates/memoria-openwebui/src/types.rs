// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Open WebUI memories API.

use memoria_core::StoredMemory;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/memories/add`.
#[derive(Debug, Serialize)]
pub struct AddMemoryForm<'a> {
    pub content: &'a str,
}

/// Body of `POST /api/v1/memories/query`.
#[derive(Debug, Serialize)]
pub struct QueryMemoryForm<'a> {
    pub content: &'a str,
    pub k: usize,
}

/// A memory row as returned by `add`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryModel {
    pub id: String,
    #[serde(default)]
    pub content: String,
}

/// Column-major query result: one inner list per query text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub documents: Vec<Vec<String>>,
    #[serde(default)]
    pub distances: Vec<Vec<f64>>,
}

impl QueryResult {
    /// Zip the first query's columns into ranked records.
    ///
    /// Rows missing a document or distance are dropped rather than guessed.
    pub fn into_memories(self) -> Vec<StoredMemory> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let documents = self.documents.into_iter().next().unwrap_or_default();
        let distances = self.distances.into_iter().next().unwrap_or_default();

        ids.into_iter()
            .zip(documents)
            .zip(distances)
            .map(|((id, text), distance)| StoredMemory { id, text, distance })
            .collect()
    }
}
