// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retroactive audit: let the model flag erroneous stored memories.

use std::collections::HashSet;
use std::sync::Arc;

use memoria_core::error::MemoriaError;
use memoria_core::traits::{ChatProvider, MemoryStore};
use memoria_core::types::UserId;
use tracing::{debug, info, warn};

use crate::consolidator::WILDCARD_QUERY;
use crate::extractor::parse_string_array;
use crate::metrics::record_audit_deleted;
use crate::prompts::{AUDIT_PROMPT, audit_prompt};

/// Counts from one audit batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Memories shown to the model.
    pub reviewed: usize,
    /// Ids the model flagged, including unknown ones.
    pub flagged: usize,
    /// Flagged ids that were in the batch and got deleted.
    pub deleted: usize,
    /// Flagged ids not present in the batch.
    pub ignored: usize,
}

/// Bulk-reviews a user's memories and deletes the ones flagged as garbage.
pub struct RetroactiveAuditor {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn MemoryStore>,
}

impl RetroactiveAuditor {
    pub fn new(provider: Arc<dyn ChatProvider>, store: Arc<dyn MemoryStore>) -> Self {
        Self { provider, store }
    }

    /// Audit up to `batch_size` memories of `user`.
    ///
    /// A zero batch size touches nothing. Only ids present in the fetched
    /// batch are deleted; an unparseable verdict deletes nothing.
    pub async fn audit_batch(
        &self,
        user: &UserId,
        batch_size: usize,
    ) -> Result<AuditReport, MemoriaError> {
        if batch_size == 0 {
            debug!(user = %user, "audit batch size is zero, nothing to do");
            return Ok(AuditReport::default());
        }

        let batch = self.store.query(user, WILDCARD_QUERY, batch_size).await?;
        if batch.is_empty() {
            return Ok(AuditReport::default());
        }

        let prompt = audit_prompt(batch.iter().map(|m| (m.id.as_str(), m.text.as_str())));
        let reply = self.provider.chat(AUDIT_PROMPT, &prompt).await?;
        let flagged = parse_string_array(&reply);

        let in_batch: HashSet<&str> = batch.iter().map(|m| m.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut report = AuditReport {
            reviewed: batch.len(),
            flagged: flagged.len(),
            ..AuditReport::default()
        };

        for id in &flagged {
            if !in_batch.contains(id.as_str()) {
                debug!(user = %user, id, "flagged id not in batch, ignored");
                report.ignored += 1;
                continue;
            }
            if !seen.insert(id.as_str()) {
                continue;
            }
            match self.store.delete(user, id).await {
                Ok(()) => report.deleted += 1,
                Err(e) => warn!(user = %user, id, error = %e, "failed to delete audited memory"),
            }
        }

        record_audit_deleted(report.deleted);
        info!(
            user = %user,
            reviewed = report.reviewed,
            flagged = report.flagged,
            deleted = report.deleted,
            ignored = report.ignored,
            "audit batch complete"
        );
        Ok(report)
    }
}
