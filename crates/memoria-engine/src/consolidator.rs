// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background consolidation: merge clusters of related memories.
//!
//! One pass fetches a bounded batch of the user's memories, groups each
//! memory with its related neighbours inside the batch, asks the model for
//! one merged text per group, and replaces the group with the merged record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use memoria_core::error::MemoriaError;
use memoria_core::traits::{ChatProvider, MemoryStore};
use memoria_core::types::{StoredMemory, UserId};
use tracing::{debug, info, warn};

use crate::prompts::SUMMARIZATION_PROMPT;
use crate::retriever::filter_candidates;
use crate::writer::{MemoryWriter, strip_timestamp};

/// Query text used to list a user's memories regardless of content.
pub const WILDCARD_QUERY: &str = "*";

/// Counts from one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Memories fetched.
    pub reviewed: usize,
    /// Groups of two or more replaced by a merged record.
    pub merged_groups: usize,
    /// Original memories removed by merges.
    pub removed: usize,
}

/// Runs consolidation passes for one user at a time.
pub struct BackgroundConsolidator {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn MemoryStore>,
    writer: Arc<MemoryWriter>,
    batch_size: usize,
    threshold: f64,
    k: usize,
}

impl BackgroundConsolidator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        store: Arc<dyn MemoryStore>,
        writer: Arc<MemoryWriter>,
        batch_size: usize,
        threshold: f64,
        k: usize,
    ) -> Self {
        Self {
            provider,
            store,
            writer,
            batch_size,
            threshold,
            k,
        }
    }

    /// Run one pass for `user`.
    ///
    /// Fails only when the batch cannot be fetched. Grouping, merge and
    /// write failures are logged per group and the pass continues.
    pub async fn consolidate(&self, user: &UserId) -> Result<ConsolidationReport, MemoriaError> {
        if self.batch_size == 0 {
            return Ok(ConsolidationReport::default());
        }

        let batch = self.store.query(user, WILDCARD_QUERY, self.batch_size).await?;
        let mut report = ConsolidationReport {
            reviewed: batch.len(),
            ..ConsolidationReport::default()
        };

        let groups = self.group(user, &batch).await;
        debug!(user = %user, reviewed = batch.len(), groups = groups.len(), "consolidation groups built");

        for group in groups {
            let texts: Vec<&str> = group.iter().map(|m| strip_timestamp(&m.text)).collect();
            let merged = match self.provider.chat(SUMMARIZATION_PROMPT, &texts.join("\n")).await {
                Ok(reply) => reply.trim().to_string(),
                Err(e) => {
                    warn!(user = %user, error = %e, "summarization call failed, group left as is");
                    continue;
                }
            };
            if merged.is_empty() {
                warn!(user = %user, "empty summary, group left as is");
                continue;
            }

            let ids: Vec<String> = group.iter().map(|m| m.id.clone()).collect();
            match self.writer.supersede(user, &ids, &merged).await {
                Ok(_) => {
                    report.merged_groups += 1;
                    report.removed += ids.len();
                }
                Err(e) => warn!(user = %user, error = %e, "failed to write merged memory"),
            }
        }

        info!(
            user = %user,
            reviewed = report.reviewed,
            merged_groups = report.merged_groups,
            removed = report.removed,
            "consolidation pass complete"
        );
        Ok(report)
    }

    /// Partition `batch` into groups of related memories, keeping only
    /// groups of two or more. Each memory joins at most one group.
    async fn group(&self, user: &UserId, batch: &[StoredMemory]) -> Vec<Vec<StoredMemory>> {
        let by_id: HashMap<&str, &StoredMemory> =
            batch.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut assigned: HashSet<String> = HashSet::new();
        let mut groups = Vec::new();

        for memory in batch {
            if assigned.contains(&memory.id) {
                continue;
            }

            let neighbours = match self.store.query(user, &memory.text, self.k).await {
                Ok(rows) => filter_candidates(rows, self.threshold),
                Err(e) => {
                    warn!(user = %user, id = memory.id, error = %e, "neighbour query failed");
                    continue;
                }
            };

            // Group members are the batch records; neighbour rows only supply ids.
            let mut group = vec![memory.clone()];
            for candidate in neighbours {
                let Some(record) = by_id.get(candidate.id.as_str()) else {
                    continue;
                };
                if candidate.id == memory.id
                    || assigned.contains(&candidate.id)
                    || group.iter().any(|m| m.id == candidate.id)
                {
                    continue;
                }
                group.push((*record).clone());
            }

            if group.len() > 1 {
                assigned.extend(group.iter().map(|m| m.id.clone()));
                groups.push(group);
            }
        }
        groups
    }
}
