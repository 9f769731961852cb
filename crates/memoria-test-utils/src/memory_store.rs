// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory memory store for deterministic testing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use memoria_core::MemoriaError;
use memoria_core::traits::{MemoryStore, PluginAdapter};
use memoria_core::types::{AdapterType, HealthStatus, StoredMemory, UserId};

/// One recorded store call.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Add { user: String, text: String },
    Query { user: String, text: String, k: usize },
    Delete { user: String, id: String },
}

/// A [`MemoryStore`] holding records per user in insertion order.
///
/// `query` answers from a scripted queue when one is loaded. Otherwise it
/// returns the user's records in insertion order, truncated to `k`, with
/// distance 0.0 for an exact text match and `unmatched_distance` for the
/// rest. Ids are `mem-<uuid>`.
#[derive(Clone)]
pub struct InMemoryStore {
    records: Arc<Mutex<HashMap<String, Vec<(String, String)>>>>,
    scripted: Arc<Mutex<VecDeque<Result<Vec<StoredMemory>, String>>>>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    unmatched_distance: f64,
    fail_adds: bool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            failing_deletes: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            unmatched_distance: 1.0,
            fail_adds: false,
        }
    }

    /// Distance reported for unscripted rows whose text differs from the query.
    pub fn with_unmatched_distance(mut self, distance: f64) -> Self {
        self.unmatched_distance = distance;
        self
    }

    /// Make every `add` fail with a store error.
    pub fn with_failing_adds(mut self) -> Self {
        self.fail_adds = true;
        self
    }

    /// Insert a record without logging a call. Returns its id.
    pub async fn seed(&self, user: &str, text: &str) -> String {
        let id = format!("mem-{}", uuid::Uuid::new_v4());
        self.records
            .lock()
            .await
            .entry(user.to_string())
            .or_default()
            .push((id.clone(), text.to_string()));
        id
    }

    /// Queue the result of the next `query` call.
    pub async fn push_query_result(&self, rows: Vec<StoredMemory>) {
        self.scripted.lock().await.push_back(Ok(rows));
    }

    /// Queue a failure for the next `query` call.
    pub async fn push_query_error(&self, message: impl Into<String>) {
        self.scripted.lock().await.push_back(Err(message.into()));
    }

    /// Make deletes of `id` fail with a store error.
    pub async fn fail_delete_of(&self, id: impl Into<String>) {
        self.failing_deletes.lock().await.insert(id.into());
    }

    /// The user's records as `(id, text)`, in insertion order.
    pub async fn records(&self, user: &str) -> Vec<(String, String)> {
        self.records
            .lock()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made so far, oldest first.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, MemoriaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn add(&self, user: &UserId, text: &str) -> Result<String, MemoriaError> {
        self.calls.lock().await.push(StoreCall::Add {
            user: user.to_string(),
            text: text.to_string(),
        });
        if self.fail_adds {
            return Err(MemoriaError::store("add rejected"));
        }
        Ok(self.seed(user.as_str(), text).await)
    }

    async fn query(
        &self,
        user: &UserId,
        text: &str,
        k: usize,
    ) -> Result<Vec<StoredMemory>, MemoriaError> {
        self.calls.lock().await.push(StoreCall::Query {
            user: user.to_string(),
            text: text.to_string(),
            k,
        });

        let scripted = self.scripted.lock().await.pop_front();
        match scripted {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(MemoriaError::store(message)),
            None => Ok(self
                .records(user.as_str())
                .await
                .into_iter()
                .take(k)
                .map(|(id, stored)| {
                    let distance = if stored == text {
                        0.0
                    } else {
                        self.unmatched_distance
                    };
                    StoredMemory {
                        id,
                        text: stored,
                        distance,
                    }
                })
                .collect()),
        }
    }

    async fn delete(&self, user: &UserId, id: &str) -> Result<(), MemoriaError> {
        self.calls.lock().await.push(StoreCall::Delete {
            user: user.to_string(),
            id: id.to_string(),
        });
        if self.failing_deletes.lock().await.contains(id) {
            return Err(MemoriaError::store(format!("delete of {id} rejected")));
        }
        if let Some(rows) = self.records.lock().await.get_mut(user.as_str()) {
            rows.retain(|(existing, _)| existing != id);
        }
        Ok(())
    }
}
