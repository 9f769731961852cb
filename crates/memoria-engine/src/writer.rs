// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamped persistence of facts.
//!
//! Memories are stored as `<local time>：<fact>`, for example
//! `2026年03月05日14点07分：用户是设计师`. The store has no metadata field the
//! engine relies on, so the timestamp lives in the text itself.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use memoria_core::error::MemoriaError;
use memoria_core::traits::MemoryStore;
use memoria_core::types::UserId;
use tracing::{debug, warn};

/// `strftime` pattern of the timestamp prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y年%m月%d日%H点%M分";

/// Separator between timestamp and fact (full-width colon).
pub const TIMESTAMP_SEPARATOR: char = '：';

/// Resolve an IANA zone name, falling back to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    Tz::from_str(name).unwrap_or_else(|_| {
        warn!(timezone = name, "unknown time zone, using UTC");
        Tz::UTC
    })
}

/// Prefix `fact` with `at` rendered in `tz`.
pub fn format_memory(fact: &str, at: DateTime<Utc>, tz: Tz) -> String {
    let local = at.with_timezone(&tz);
    format!(
        "{}{TIMESTAMP_SEPARATOR}{fact}",
        local.format(TIMESTAMP_FORMAT)
    )
}

/// Split a stored memory into its local timestamp and fact body.
///
/// Returns `None` when the text carries no parseable prefix.
pub fn parse_timestamp_prefix(text: &str) -> Option<(NaiveDateTime, &str)> {
    let (prefix, body) = text.split_once(TIMESTAMP_SEPARATOR)?;
    let at = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()?;
    Some((at, body))
}

/// Fact body of a stored memory, or the whole text when unprefixed.
pub fn strip_timestamp(text: &str) -> &str {
    parse_timestamp_prefix(text)
        .map(|(_, body)| body)
        .unwrap_or(text)
}

/// Writes facts to the store, replacing superseded records on update.
pub struct MemoryWriter {
    store: Arc<dyn MemoryStore>,
    tz: Tz,
}

impl MemoryWriter {
    pub fn new(store: Arc<dyn MemoryStore>, timezone: &str) -> Self {
        Self {
            store,
            tz: resolve_timezone(timezone),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Save `fact` stamped with the current time. Returns the new id.
    pub async fn save(&self, user: &UserId, fact: &str) -> Result<String, MemoriaError> {
        self.save_at(user, fact, Utc::now()).await
    }

    /// Save `fact` stamped with `at`.
    pub async fn save_at(
        &self,
        user: &UserId,
        fact: &str,
        at: DateTime<Utc>,
    ) -> Result<String, MemoriaError> {
        let text = format_memory(fact, at, self.tz);
        let id = self.store.add(user, &text).await?;
        debug!(user = %user, id, "memory saved");
        Ok(id)
    }

    /// Delete every id in `ids`, then save `fact`.
    ///
    /// Not transactional: a crash between the deletes and the add loses the
    /// superseded records. A failed delete is logged and the rest proceed.
    pub async fn supersede(
        &self,
        user: &UserId,
        ids: &[String],
        fact: &str,
    ) -> Result<String, MemoriaError> {
        for id in ids {
            if let Err(e) = self.store.delete(user, id).await {
                warn!(user = %user, id, error = %e, "failed to delete superseded memory");
            }
        }
        self.save(user, fact).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use memoria_test_utils::{InMemoryStore, StoreCall};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, 6, 7, 30).unwrap()
    }

    #[test]
    fn formats_in_zone() {
        let text = format_memory("用户是设计师", at(), resolve_timezone("Asia/Shanghai"));
        assert_eq!(text, "2026年03月05日14点07分：用户是设计师");
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        assert_eq!(resolve_timezone("Mars/Olympus_Mons"), Tz::UTC);
        let text = format_memory("x", at(), resolve_timezone("nope"));
        assert_eq!(text, "2026年03月05日06点07分：x");
    }

    #[test]
    #[tracing_test::traced_test]
    fn unknown_zone_is_logged() {
        resolve_timezone("Atlantis/Capital");
        assert!(logs_contain("unknown time zone"));
    }

    #[test]
    fn parses_prefix_back() {
        let (when, body) = parse_timestamp_prefix("2026年03月05日14点07分：用户是设计师").unwrap();
        assert_eq!(
            when,
            NaiveDate::from_ymd_opt(2026, 3, 5)
                .unwrap()
                .and_hms_opt(14, 7, 0)
                .unwrap()
        );
        assert_eq!(body, "用户是设计师");
    }

    #[test]
    fn body_may_contain_separator() {
        let (_, body) = parse_timestamp_prefix("2026年03月05日14点07分：a：b").unwrap();
        assert_eq!(body, "a：b");
    }

    #[test]
    fn unprefixed_text_is_none() {
        assert!(parse_timestamp_prefix("just a fact").is_none());
        assert!(parse_timestamp_prefix("yesterday：a fact").is_none());
        assert_eq!(strip_timestamp("just a fact"), "just a fact");
    }

    #[tokio::test]
    async fn supersede_deletes_then_adds() {
        let store = InMemoryStore::new();
        let old = store.seed("u1", "old").await;
        let writer = MemoryWriter::new(Arc::new(store.clone()), "UTC");

        writer
            .supersede(&UserId::from("u1"), std::slice::from_ref(&old), "new")
            .await
            .unwrap();

        let calls = store.calls().await;
        assert_eq!(
            calls[0],
            StoreCall::Delete {
                user: "u1".into(),
                id: old
            }
        );
        assert!(matches!(&calls[1], StoreCall::Add { text, .. } if text.ends_with("：new")));
        let records = store.records("u1").await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_does_not_abort() {
        let store = InMemoryStore::new();
        store.fail_delete_of("a").await;
        let writer = MemoryWriter::new(Arc::new(store.clone()), "UTC");

        writer
            .supersede(&UserId::from("u1"), &["a".into(), "b".into()], "fact")
            .await
            .unwrap();

        let deletes = store
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, StoreCall::Delete { .. }))
            .count();
        assert_eq!(deletes, 2);
        assert_eq!(store.records("u1").await.len(), 1);
    }

    #[tokio::test]
    async fn save_surfaces_store_error() {
        let store = InMemoryStore::new().with_failing_adds();
        let writer = MemoryWriter::new(Arc::new(store), "UTC");
        let err = writer.save(&UserId::from("u1"), "fact").await.unwrap_err();
        assert!(matches!(err, MemoriaError::Store { .. }));
    }
}
