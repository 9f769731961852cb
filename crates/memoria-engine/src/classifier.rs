// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relationship classification of a fact against related memories.

use std::sync::Arc;

use memoria_core::traits::ChatProvider;
use tracing::{debug, warn};

use crate::prompts::{CLASSIFIER_SYSTEM_PROMPT, classifier_prompt};
use crate::types::{Classification, SimilarityCandidate};

/// Relationship named in a classifier reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Duplicate,
    Update,
    New,
}

/// Read the relationship out of free-form model text.
///
/// Case-insensitive substring match; `duplicate` wins over `update`, and a
/// reply naming neither is `New`.
pub fn parse_relationship(reply: &str) -> Relationship {
    let reply = reply.to_lowercase();
    if reply.contains("duplicate") {
        Relationship::Duplicate
    } else if reply.contains("update") {
        Relationship::Update
    } else {
        Relationship::New
    }
}

/// Decides whether a fact is new, already known, or supersedes memories.
pub struct RelationshipClassifier {
    provider: Arc<dyn ChatProvider>,
}

impl RelationshipClassifier {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Classify `fact` against `candidates`.
    ///
    /// No candidates means new without a model call. A failed call also
    /// falls back to new. An update targets every candidate.
    pub async fn classify(&self, fact: &str, candidates: &[SimilarityCandidate]) -> Classification {
        if candidates.is_empty() {
            return Classification::new_fact();
        }

        let prompt = classifier_prompt(fact, candidates.iter().map(|c| c.text.as_str()));
        let reply = match self.provider.chat(CLASSIFIER_SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(fact, error = %e, "classifier call failed, treating fact as new");
                return Classification::new_fact();
            }
        };

        let relationship = parse_relationship(&reply);
        debug!(fact, ?relationship, candidates = candidates.len(), "fact classified");
        match relationship {
            Relationship::Duplicate => Classification::skip(),
            Relationship::Update => {
                Classification::update(candidates.iter().map(|c| c.id.clone()).collect())
            }
            Relationship::New => Classification::new_fact(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;
    use memoria_test_utils::MockChatProvider;

    fn candidate(id: &str, similarity: f64) -> SimilarityCandidate {
        SimilarityCandidate {
            id: id.to_string(),
            text: format!("memory {id}"),
            similarity,
        }
    }

    #[test]
    fn parse_duplicate() {
        assert_eq!(parse_relationship("Duplicate"), Relationship::Duplicate);
        assert_eq!(
            parse_relationship("This is a DUPLICATE, not an update"),
            Relationship::Duplicate
        );
    }

    #[test]
    fn parse_update() {
        assert_eq!(parse_relationship("update."), Relationship::Update);
        assert_eq!(parse_relationship("  Update  "), Relationship::Update);
    }

    #[test]
    fn parse_new() {
        assert_eq!(parse_relationship("new"), Relationship::New);
    }

    #[test]
    fn parse_without_keyword_is_new() {
        assert_eq!(parse_relationship("I am not sure"), Relationship::New);
        assert_eq!(parse_relationship(""), Relationship::New);
    }

    #[tokio::test]
    async fn no_candidates_skips_model() {
        let mock = Arc::new(MockChatProvider::new());
        let classifier = RelationshipClassifier::new(mock.clone());

        let result = classifier.classify("fact", &[]).await;
        assert_eq!(result, Classification::new_fact());
        assert_eq!(mock.call_count().await, 0);
    }

    #[tokio::test]
    async fn update_targets_all_candidates() {
        let mock = Arc::new(MockChatProvider::with_replies(["update"]));
        let classifier = RelationshipClassifier::new(mock);

        let result = classifier
            .classify("fact", &[candidate("a", 0.9), candidate("b", 0.8)])
            .await;
        assert_eq!(result.action, Action::Update);
        assert_eq!(result.target_ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn duplicate_is_skip_without_targets() {
        let mock = Arc::new(MockChatProvider::with_replies(["duplicate"]));
        let classifier = RelationshipClassifier::new(mock);

        let result = classifier.classify("fact", &[candidate("a", 0.9)]).await;
        assert_eq!(result, Classification::skip());
    }

    #[tokio::test]
    async fn model_error_is_new() {
        let mock = Arc::new(MockChatProvider::new());
        mock.push_error("timeout").await;
        let classifier = RelationshipClassifier::new(mock);

        let result = classifier.classify("fact", &[candidate("a", 0.9)]).await;
        assert_eq!(result, Classification::new_fact());
    }

    #[tokio::test]
    async fn prompt_contains_candidate_texts() {
        let mock = Arc::new(MockChatProvider::with_replies(["new"]));
        let classifier = RelationshipClassifier::new(mock.clone());
        classifier.classify("likes tea", &[candidate("a", 0.9)]).await;

        let calls = mock.calls().await;
        assert_eq!(calls[0].0, CLASSIFIER_SYSTEM_PROMPT);
        assert!(calls[0].1.contains("memory a"));
    }
}
