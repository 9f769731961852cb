// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user consolidation counter and in-flight guard.
//!
//! State lives only in process memory and starts at `{0, false}` after a
//! restart. Each user's read-modify-write happens under that user's map
//! shard lock, so users never contend on a single global lock.

use std::sync::Arc;

use dashmap::DashMap;
use memoria_core::types::UserId;
use tracing::debug;

/// Counter and in-flight flag for one user.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationState {
    /// Facts saved since the last threshold crossing.
    pub counter: u32,
    /// A consolidation or audit task is running.
    pub in_flight: bool,
}

/// Result of recording one saved fact.
#[derive(Debug)]
pub enum TriggerDecision {
    /// Below the period; nothing to do.
    Counted,
    /// Threshold crossed; the caller must run a consolidation while holding
    /// the guard.
    Schedule(InFlightGuard),
    /// Threshold crossed while a task was running. The counter was reset and
    /// no new task is scheduled.
    Absorbed,
}

/// Owns the per-user consolidation state.
#[derive(Clone)]
pub struct ConsolidationTracker {
    period: u32,
    states: Arc<DashMap<UserId, ConsolidationState>>,
}

impl ConsolidationTracker {
    /// `period` is the number of saves between consolidations; zero is
    /// treated as one.
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            states: Arc::new(DashMap::new()),
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Count one saved fact and decide whether to consolidate.
    pub fn record_save(&self, user: &UserId) -> TriggerDecision {
        let mut state = self.states.entry(user.clone()).or_default();
        state.counter += 1;
        if state.counter < self.period {
            return TriggerDecision::Counted;
        }

        state.counter = 0;
        if state.in_flight {
            debug!(user = %user, "consolidation already in flight, crossing absorbed");
            return TriggerDecision::Absorbed;
        }
        state.in_flight = true;
        drop(state);

        TriggerDecision::Schedule(InFlightGuard {
            states: Arc::clone(&self.states),
            user: user.clone(),
            kind: GuardKind::Consolidation,
        })
    }

    /// Claim the in-flight slot for an audit. `None` when a task is running.
    pub fn try_acquire_audit(&self, user: &UserId) -> Option<InFlightGuard> {
        let mut state = self.states.entry(user.clone()).or_default();
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        drop(state);

        Some(InFlightGuard {
            states: Arc::clone(&self.states),
            user: user.clone(),
            kind: GuardKind::Audit,
        })
    }

    /// Current state for `user`, `{0, false}` if never seen.
    pub fn snapshot(&self, user: &UserId) -> ConsolidationState {
        self.states.get(user).map(|s| *s).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
enum GuardKind {
    Consolidation,
    Audit,
}

/// Holds a user's in-flight slot; releasing it on drop.
///
/// A consolidation guard resets the state to `{0, false}`. An audit guard
/// only clears the flag, leaving the save counter alone. Drop runs on
/// success, error, timeout and task abort alike.
#[derive(Debug)]
pub struct InFlightGuard {
    states: Arc<DashMap<UserId, ConsolidationState>>,
    user: UserId,
    kind: GuardKind,
}

impl InFlightGuard {
    pub fn user(&self) -> &UserId {
        &self.user
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(mut state) = self.states.get_mut(&self.user) {
            match self.kind {
                GuardKind::Consolidation => *state = ConsolidationState::default(),
                GuardKind::Audit => state.in_flight = false,
            }
        }
    }
}
