// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn memory pipeline.
//!
//! Extractor -> (per fact) Retriever -> Classifier -> Writer -> Trigger.
//! Facts are processed one after another; a failure on one fact is logged
//! and the loop moves on. Consolidation and audits run detached under the
//! [`TaskSupervisor`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use memoria_config::model::{MemoriaConfig, MemoryConfig};
use memoria_core::error::MemoriaError;
use memoria_core::traits::{ChatProvider, MemoryStore};
use memoria_core::types::{ChatMessage, UserId};
use tracing::{debug, info, warn};

use crate::auditor::{AuditReport, RetroactiveAuditor};
use crate::classifier::RelationshipClassifier;
use crate::consolidation::{ConsolidationTracker, TriggerDecision};
use crate::consolidator::BackgroundConsolidator;
use crate::extractor::FactExtractor;
use crate::metrics;
use crate::retriever::SimilarityRetriever;
use crate::supervisor::{TaskKind, TaskSupervisor};
use crate::types::{Action, TurnOutcome, TurnStatus};
use crate::writer::MemoryWriter;

/// Turns with fewer messages than this are skipped.
const MIN_MESSAGES: usize = 2;

/// Wires every engine component together for one process.
pub struct MemoryPipeline {
    memory: MemoryConfig,
    extractor: FactExtractor,
    retriever: SimilarityRetriever,
    classifier: RelationshipClassifier,
    writer: Arc<MemoryWriter>,
    tracker: ConsolidationTracker,
    consolidator: Arc<BackgroundConsolidator>,
    auditor: Arc<RetroactiveAuditor>,
    supervisor: Arc<TaskSupervisor>,
}

impl MemoryPipeline {
    pub fn new(
        config: &MemoriaConfig,
        provider: Arc<dyn ChatProvider>,
        store: Arc<dyn MemoryStore>,
        supervisor: Arc<TaskSupervisor>,
    ) -> Self {
        let memory = config.memory.clone();
        let writer = Arc::new(MemoryWriter::new(Arc::clone(&store), &memory.timezone));

        Self {
            extractor: FactExtractor::new(
                Arc::clone(&provider),
                memory.messages_to_consider,
                memory.context_pair_only,
            ),
            retriever: SimilarityRetriever::new(
                Arc::clone(&store),
                memory.similarity_threshold,
                memory.retrieval_k,
            ),
            classifier: RelationshipClassifier::new(Arc::clone(&provider)),
            tracker: ConsolidationTracker::new(memory.summarize_after_n_memories),
            consolidator: Arc::new(BackgroundConsolidator::new(
                Arc::clone(&provider),
                Arc::clone(&store),
                Arc::clone(&writer),
                config.background.consolidation_batch_size,
                memory.similarity_threshold,
                memory.retrieval_k,
            )),
            auditor: Arc::new(RetroactiveAuditor::new(provider, store)),
            writer,
            supervisor,
            memory,
        }
    }

    pub fn tracker(&self) -> &ConsolidationTracker {
        &self.tracker
    }

    pub fn supervisor(&self) -> &Arc<TaskSupervisor> {
        &self.supervisor
    }

    /// Process one finished conversation turn.
    ///
    /// Never fails; problems surface as log lines and smaller counts.
    pub async fn process_turn(&self, user: Option<&UserId>, messages: &[ChatMessage]) -> TurnOutcome {
        let started = Instant::now();

        let user = match user {
            Some(user) if self.memory.enabled && messages.len() >= MIN_MESSAGES => user,
            _ => {
                debug!(
                    enabled = self.memory.enabled,
                    has_user = user.is_some(),
                    messages = messages.len(),
                    "turn skipped"
                );
                return TurnOutcome::with_status(TurnStatus::Skipped, started.elapsed());
            }
        };

        let outcome = if self.memory.audit_mode {
            let status = if self.schedule_audit(user) {
                TurnStatus::AuditScheduled
            } else {
                TurnStatus::AuditBusy
            };
            TurnOutcome::with_status(status, started.elapsed())
        } else {
            self.run_pipeline(user, messages, started).await
        };

        metrics::record_turn_duration(outcome.elapsed.as_secs_f64());
        info!(
            user = %user,
            status = %outcome.status,
            saved = outcome.saved,
            updated = outcome.updated,
            skipped = outcome.skipped,
            net_count_delta = outcome.net_count_delta(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "turn processed"
        );
        outcome
    }

    async fn run_pipeline(&self, user: &UserId, messages: &[ChatMessage], started: Instant) -> TurnOutcome {
        let facts = self.extractor.extract(messages).await;
        metrics::record_extracted(facts.len());

        let mut outcome = TurnOutcome::with_status(TurnStatus::Success, Duration::ZERO);
        outcome.extracted = facts.len();

        for fact in &facts {
            let candidates = self.retriever.query(user, fact).await;
            let classification = self.classifier.classify(fact, &candidates).await;

            let written = match classification.action {
                Action::Skip => {
                    debug!(user = %user, fact, "duplicate fact skipped");
                    outcome.skipped += 1;
                    metrics::record_fact(Action::Skip);
                    continue;
                }
                Action::Update if !classification.target_ids.is_empty() => self
                    .writer
                    .supersede(user, &classification.target_ids, fact)
                    .await
                    .map(|_| Action::Update),
                _ => self.writer.save(user, fact).await.map(|_| Action::New),
            };

            match written {
                Ok(action) => {
                    match action {
                        Action::Update => outcome.updated += 1,
                        _ => outcome.saved += 1,
                    }
                    metrics::record_fact(action);
                    self.on_fact_saved(user);
                }
                Err(e) => warn!(user = %user, fact, error = %e, "failed to persist fact"),
            }
        }

        outcome.elapsed = started.elapsed();
        outcome
    }

    /// Count a saved fact and schedule a consolidation on threshold crossing.
    fn on_fact_saved(&self, user: &UserId) {
        match self.tracker.record_save(user) {
            TriggerDecision::Counted | TriggerDecision::Absorbed => {}
            TriggerDecision::Schedule(guard) => {
                info!(user = %user, "scheduling consolidation");
                let consolidator = Arc::clone(&self.consolidator);
                let task_user = user.clone();
                self.supervisor.spawn(guard, TaskKind::Consolidation, async move {
                    consolidator.consolidate(&task_user).await.map(|_| ())
                });
            }
        }
    }

    /// Dispatch one detached audit batch. `false` if a task is already
    /// running for `user`.
    pub fn schedule_audit(&self, user: &UserId) -> bool {
        let Some(guard) = self.tracker.try_acquire_audit(user) else {
            info!(user = %user, "background task in flight, audit not scheduled");
            return false;
        };

        let auditor = Arc::clone(&self.auditor);
        let task_user = user.clone();
        let batch_size = self.memory.audit_batch_size;
        self.supervisor.spawn(guard, TaskKind::Audit, async move {
            auditor.audit_batch(&task_user, batch_size).await.map(|_| ())
        });
        true
    }

    /// Run one audit batch in the foreground, holding the user's slot.
    ///
    /// Bounded by the supervisor's task timeout, like a detached audit.
    pub async fn run_audit(&self, user: &UserId, batch_size: usize) -> Result<AuditReport, MemoriaError> {
        let _guard = self.tracker.try_acquire_audit(user).ok_or_else(|| {
            MemoriaError::Internal(format!("a background task is already running for `{user}`"))
        })?;
        let timeout = self.supervisor.task_timeout();
        tokio::time::timeout(timeout, self.auditor.audit_batch(user, batch_size))
            .await
            .map_err(|_| MemoriaError::Timeout { duration: timeout })?
    }
}
