// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact-memory consolidation engine for Memoria.
//!
//! Given a finished conversation turn, the engine extracts durable facts
//! about the user, compares each against related stored memories, and
//! saves, skips or supersedes accordingly. Every N saved facts per user a
//! background consolidation merges clusters of related memories. A
//! separate audit mode deletes memories a model flags as erroneous.

pub mod auditor;
pub mod classifier;
pub mod consolidation;
pub mod consolidator;
pub mod extractor;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod retriever;
pub mod supervisor;
pub mod types;
pub mod writer;

pub use auditor::{AuditReport, RetroactiveAuditor};
pub use classifier::{Relationship, RelationshipClassifier, parse_relationship};
pub use consolidation::{ConsolidationState, ConsolidationTracker, InFlightGuard, TriggerDecision};
pub use consolidator::{BackgroundConsolidator, ConsolidationReport};
pub use extractor::FactExtractor;
pub use metrics::register_metrics;
pub use pipeline::MemoryPipeline;
pub use retriever::SimilarityRetriever;
pub use supervisor::{TaskKind, TaskOutcome, TaskSupervisor};
pub use types::{Action, Classification, SimilarityCandidate, TurnOutcome, TurnStatus};
pub use writer::{MemoryWriter, parse_timestamp_prefix};
