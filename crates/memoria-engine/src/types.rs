// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine data types: similarity candidates, classification results and
//! per-turn outcomes.

use std::time::Duration;

use strum::{Display, IntoStaticStr};

/// A stored memory judged related to a fact.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCandidate {
    /// Store-assigned id.
    pub id: String,
    /// Stored text, timestamp prefix included.
    pub text: String,
    /// `1 - distance`.
    pub similarity: f64,
}

/// What to do with a fact after comparing it to its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Persist the fact as a new memory.
    New,
    /// The fact is already known; write nothing.
    Skip,
    /// The fact supersedes `target_ids`.
    Update,
}

/// Classifier verdict for one fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub action: Action,
    /// Ids to delete before saving. Non-empty only for [`Action::Update`].
    pub target_ids: Vec<String>,
}

impl Classification {
    pub fn new_fact() -> Self {
        Self {
            action: Action::New,
            target_ids: Vec::new(),
        }
    }

    pub fn skip() -> Self {
        Self {
            action: Action::Skip,
            target_ids: Vec::new(),
        }
    }

    pub fn update(target_ids: Vec<String>) -> Self {
        Self {
            action: Action::Update,
            target_ids,
        }
    }
}

/// Why a turn produced no memory work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TurnStatus {
    /// Facts were extracted (possibly zero) and processed.
    Success,
    /// Engine disabled, no user, or fewer than two messages.
    Skipped,
    /// Audit mode: an audit batch was dispatched.
    AuditScheduled,
    /// Audit mode: a background task was already running for the user.
    AuditBusy,
}

/// Result of one call to the per-turn pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    /// Facts returned by the extractor.
    pub extracted: usize,
    /// Facts written as new memories.
    pub saved: u32,
    /// Facts that replaced older memories.
    pub updated: u32,
    /// Facts classified as duplicates.
    pub skipped: u32,
    pub elapsed: Duration,
}

impl TurnOutcome {
    pub(crate) fn with_status(status: TurnStatus, elapsed: Duration) -> Self {
        Self {
            status,
            extracted: 0,
            saved: 0,
            updated: 0,
            skipped: 0,
            elapsed,
        }
    }

    /// Change in the user's memory count attributable to this turn.
    pub fn net_count_delta(&self) -> i64 {
        i64::from(self.saved) - i64::from(self.updated)
    }

    /// Short human-readable summary.
    pub fn message(&self) -> String {
        match self.status {
            TurnStatus::Skipped => "skipped".to_string(),
            TurnStatus::AuditScheduled => "audit scheduled".to_string(),
            TurnStatus::AuditBusy => "audit already running".to_string(),
            TurnStatus::Success if self.extracted == 0 => "no new facts".to_string(),
            TurnStatus::Success => format!("+{} saved, {} updated", self.saved, self.updated),
        }
    }

    /// Status line shown to the user after a turn.
    pub fn status_line(&self) -> String {
        format!(
            "memory: {} | elapsed: {:.2}s",
            self.message(),
            self.elapsed.as_secs_f64()
        )
    }
}
