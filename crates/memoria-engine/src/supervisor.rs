// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Supervision of detached per-user background tasks.
//!
//! Every consolidation or audit runs under a [`TaskSupervisor`], which keeps
//! one join handle per user and bounds each task by a timeout and a shared
//! [`CancellationToken`]. The task owns its [`InFlightGuard`], so the user's
//! slot is released however the task ends.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use memoria_core::error::MemoriaError;
use memoria_core::types::UserId;
use strum::IntoStaticStr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::consolidation::InFlightGuard;
use crate::metrics::record_task;

/// Kind of background task, used as a log field and metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TaskKind {
    Consolidation,
    Audit,
}

/// How a supervised task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

/// Tracks background tasks, one per user.
pub struct TaskSupervisor {
    tasks: DashMap<UserId, JoinHandle<TaskOutcome>>,
    cancel: CancellationToken,
    task_timeout: Duration,
}

impl TaskSupervisor {
    pub fn new(task_timeout: Duration) -> Self {
        Self::with_token(CancellationToken::new(), task_timeout)
    }

    /// Supervisor whose tasks stop when `cancel` fires.
    pub fn with_token(cancel: CancellationToken, task_timeout: Duration) -> Self {
        Self {
            tasks: DashMap::new(),
            cancel,
            task_timeout,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Upper bound on one task's run time.
    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Run `task` in the background for the guard's user.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, guard: InFlightGuard, kind: TaskKind, task: F)
    where
        F: Future<Output = Result<(), MemoriaError>> + Send + 'static,
    {
        self.reap();

        let user = guard.user().clone();
        let cancel = self.cancel.clone();
        let timeout = self.task_timeout;
        let log_user = user.clone();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let kind_label: &'static str = kind.into();
            debug!(user = %log_user, kind = kind_label, "background task started");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => TaskOutcome::Cancelled,
                result = tokio::time::timeout(timeout, task) => match result {
                    Ok(Ok(())) => TaskOutcome::Completed,
                    Ok(Err(e)) => {
                        warn!(user = %log_user, kind = kind_label, error = %e, "background task failed");
                        TaskOutcome::Failed
                    }
                    Err(_) => {
                        let e = MemoriaError::Timeout { duration: timeout };
                        warn!(user = %log_user, kind = kind_label, error = %e, "background task timed out");
                        TaskOutcome::TimedOut
                    }
                },
            };

            let outcome_label: &'static str = outcome.into();
            info!(user = %log_user, kind = kind_label, outcome = outcome_label, "background task finished");
            record_task(kind_label, outcome_label);
            outcome
        });

        if let Some(previous) = self.tasks.insert(user.clone(), handle) {
            if !previous.is_finished() {
                warn!(user = %user, "replaced a running background task handle");
            }
        }
    }

    /// Abort the user's task. Returns `true` if one was still running.
    pub fn cancel_user(&self, user: &UserId) -> bool {
        match self.tasks.remove(user) {
            Some((_, handle)) => {
                let running = !handle.is_finished();
                handle.abort();
                if running {
                    info!(user = %user, "background task cancelled");
                }
                running
            }
            None => false,
        }
    }

    /// Wait for the user's task, if any, and return how it ended.
    pub async fn join_user(&self, user: &UserId) -> Option<TaskOutcome> {
        let (_, handle) = self.tasks.remove(user)?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_cancelled() => Some(TaskOutcome::Cancelled),
            Err(e) => {
                warn!(user = %user, error = %e, "background task panicked");
                Some(TaskOutcome::Failed)
            }
        }
    }

    /// Number of tasks still running.
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|e| !e.value().is_finished()).count()
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        info!("cancelling background tasks");
        self.cancel.cancel();
    }

    /// Wait up to `grace` for running tasks, aborting the rest.
    ///
    /// Returns the number of tasks aborted.
    pub async fn drain(&self, grace: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + grace;
        let users: Vec<UserId> = self.tasks.iter().map(|e| e.key().clone()).collect();
        if users.is_empty() {
            return 0;
        }
        info!(count = users.len(), grace_secs = grace.as_secs(), "draining background tasks");

        let mut aborted = 0;
        for user in users {
            let Some((_, mut handle)) = self.tasks.remove(&user) else {
                continue;
            };
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                warn!(user = %user, "background task did not finish in time, aborting");
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    fn reap(&self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }
}
