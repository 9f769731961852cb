// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Open WebUI memories API adapter for Memoria.
//!
//! Implements [`MemoryStore`] on top of Open WebUI's per-user memory
//! endpoints. Open WebUI embeds, indexes and assigns ids; this adapter is
//! pure transport. The user is identified by the bearer token sent with each
//! request.

pub mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use memoria_config::model::StoreConfig;
use memoria_core::error::MemoriaError;
use memoria_core::traits::{MemoryStore, PluginAdapter};
use memoria_core::types::{AdapterType, HealthStatus, StoredMemory, UserId};
use reqwest::StatusCode;
use tracing::debug;

use crate::types::{AddMemoryForm, MemoryModel, QueryMemoryForm, QueryResult};

/// Memory store backed by an Open WebUI instance.
pub struct OpenWebUiStore {
    client: reqwest::Client,
    base_url: String,
    default_token: Option<String>,
    user_tokens: BTreeMap<String, String>,
}

impl OpenWebUiStore {
    /// Creates a store client from the `[store]` config section.
    pub fn new(config: &StoreConfig) -> Result<Self, MemoriaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MemoriaError::Store {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_token: config.api_key.clone().filter(|t| !t.is_empty()),
            user_tokens: config.user_tokens.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Bearer token for `user`: its own entry first, then the default token.
    fn token_for(&self, user: &UserId) -> Result<&str, MemoriaError> {
        self.user_tokens
            .get(user.as_str())
            .or(self.default_token.as_ref())
            .map(String::as_str)
            .ok_or_else(|| {
                MemoriaError::Config(format!("no store token configured for user `{user}`"))
            })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, MemoriaError> {
        request.send().await.map_err(|e| MemoriaError::Store {
            message: format!("{what} request failed: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

/// Turn a non-success response into a store error carrying the body.
async fn status_error(response: reqwest::Response, what: &str) -> MemoriaError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    MemoriaError::store(format!("{what} returned {status}: {body}"))
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, MemoriaError> {
    response.json::<T>().await.map_err(|e| MemoriaError::Store {
        message: format!("failed to parse {what} response: {e}"),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl PluginAdapter for OpenWebUiStore {
    fn name(&self) -> &str {
        "openwebui"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, MemoriaError> {
        let response = match self.send(self.client.get(self.url("/health")), "health").await {
            Ok(r) => r,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        if response.status().is_success() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "health endpoint returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl MemoryStore for OpenWebUiStore {
    async fn add(&self, user: &UserId, text: &str) -> Result<String, MemoriaError> {
        let request = self
            .client
            .post(self.url("/api/v1/memories/add"))
            .bearer_auth(self.token_for(user)?)
            .json(&AddMemoryForm { content: text });
        let response = self.send(request, "add").await?;
        if !response.status().is_success() {
            return Err(status_error(response, "add").await);
        }

        let memory: MemoryModel = parse_json(response, "add").await?;
        debug!(user = %user, id = memory.id, "memory added");
        Ok(memory.id)
    }

    async fn query(
        &self,
        user: &UserId,
        text: &str,
        k: usize,
    ) -> Result<Vec<StoredMemory>, MemoriaError> {
        let request = self
            .client
            .post(self.url("/api/v1/memories/query"))
            .bearer_auth(self.token_for(user)?)
            .json(&QueryMemoryForm { content: text, k });
        let response = self.send(request, "query").await?;
        if !response.status().is_success() {
            return Err(status_error(response, "query").await);
        }

        // Open WebUI answers `null` when the user has no memories yet.
        let result: Option<QueryResult> = parse_json(response, "query").await?;
        Ok(result.map(QueryResult::into_memories).unwrap_or_default())
    }

    async fn delete(&self, user: &UserId, id: &str) -> Result<(), MemoriaError> {
        let request = self
            .client
            .delete(self.url(&format!("/api/v1/memories/{id}")))
            .bearer_auth(self.token_for(user)?);
        let response = self.send(request, "delete").await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(user = %user, id, "memory already gone");
                Ok(())
            }
            _ => Err(status_error(response, "delete").await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> OpenWebUiStore {
        let mut user_tokens = BTreeMap::new();
        user_tokens.insert("alice".to_string(), "tok-alice".to_string());
        OpenWebUiStore::new(&StoreConfig {
            base_url: format!("{}/", server.uri()),
            api_key: Some("tok-default".into()),
            user_tokens,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn add_posts_content_and_returns_store_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/memories/add"))
            .and(header("authorization", "Bearer tok-alice"))
            .and(body_json(serde_json::json!({"content": "2026年10月17日09点30分：用户是设计师"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "mem-1",
                "user_id": "alice",
                "content": "2026年10月17日09点30分：用户是设计师",
                "created_at": 1,
                "updated_at": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let id = store
            .add(&UserId::from("alice"), "2026年10月17日09点30分：用户是设计师")
            .await
            .unwrap();
        assert_eq!(id, "mem-1");
    }

    #[tokio::test]
    async fn query_uses_default_token_and_maps_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/memories/query"))
            .and(header("authorization", "Bearer tok-default"))
            .and(body_json(serde_json::json!({"content": "designer", "k": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ids": [["m1", "m2"]],
                "documents": [["a", "b"]],
                "metadatas": [[null, null]],
                "distances": [[0.18, 0.5]]
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let rows = store.query(&UserId::from("bob"), "designer", 5).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "m1");
        assert!((rows[0].distance - 0.18).abs() < 1e-9);
    }

    #[tokio::test]
    async fn query_null_body_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/memories/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let rows = store.query(&UserId::from("alice"), "x", 5).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn query_error_status_is_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/memories/query"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store.query(&UserId::from("alice"), "x", 5).await.unwrap_err();
        assert!(matches!(err, MemoriaError::Store { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn delete_missing_id_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/memories/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let user = UserId::from("alice");
        store.delete(&user, "gone").await.unwrap();
        store.delete(&user, "gone").await.unwrap();
    }

    #[tokio::test]
    async fn delete_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/memories/m1"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let err = store.delete(&UserId::from("alice"), "m1").await.unwrap_err();
        assert!(err.to_string().contains("forbidden"));
    }

    #[tokio::test]
    async fn missing_token_is_config_error() {
        let server = MockServer::start().await;
        let store = OpenWebUiStore::new(&StoreConfig {
            base_url: server.uri(),
            ..StoreConfig::default()
        })
        .unwrap();
        let err = store.add(&UserId::from("carol"), "fact").await.unwrap_err();
        assert!(matches!(err, MemoriaError::Config(_)));
    }

    #[tokio::test]
    async fn health_check_hits_health_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": true})))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
