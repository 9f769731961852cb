// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold-filtered similarity lookup over the memory store.

use std::sync::Arc;

use memoria_core::traits::MemoryStore;
use memoria_core::types::{StoredMemory, UserId};
use tracing::{debug, warn};

use crate::types::SimilarityCandidate;

/// Finds stored memories related to a fact.
pub struct SimilarityRetriever {
    store: Arc<dyn MemoryStore>,
    threshold: f64,
    k: usize,
}

impl SimilarityRetriever {
    pub fn new(store: Arc<dyn MemoryStore>, threshold: f64, k: usize) -> Self {
        Self { store, threshold, k }
    }

    /// Related memories for `fact`, in store order.
    ///
    /// A store failure yields an empty list, so the fact is treated as new.
    pub async fn query(&self, user: &UserId, fact: &str) -> Vec<SimilarityCandidate> {
        match self.store.query(user, fact, self.k).await {
            Ok(rows) => {
                let candidates = filter_candidates(rows, self.threshold);
                debug!(user = %user, fact, candidates = candidates.len(), "similarity lookup");
                candidates
            }
            Err(e) => {
                warn!(user = %user, fact, error = %e, "similarity query failed");
                Vec::new()
            }
        }
    }
}

/// Convert distances to similarities and keep rows with
/// `similarity >= threshold`, preserving order.
pub fn filter_candidates(rows: Vec<StoredMemory>, threshold: f64) -> Vec<SimilarityCandidate> {
    rows.into_iter()
        .filter_map(|row| {
            let similarity = 1.0 - row.distance;
            (similarity >= threshold).then_some(SimilarityCandidate {
                id: row.id,
                text: row.text,
                similarity,
            })
        })
        .collect()
}
