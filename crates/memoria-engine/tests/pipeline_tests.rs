// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests against mock adapters.

use std::sync::Arc;
use std::time::Duration;

use memoria_config::model::MemoriaConfig;
use memoria_core::MemoriaError;
use memoria_core::types::{ChatMessage, StoredMemory, UserId};
use memoria_engine::{
    ConsolidationState, MemoryPipeline, TaskOutcome, TaskSupervisor, TurnStatus,
    parse_timestamp_prefix,
};
use memoria_test_utils::{InMemoryStore, MockChatProvider, StoreCall, test_config};

struct Harness {
    provider: MockChatProvider,
    store: InMemoryStore,
    pipeline: MemoryPipeline,
}

fn harness_with(config: MemoriaConfig) -> Harness {
    harness_with_provider(config, MockChatProvider::new())
}

fn harness_with_provider(config: MemoriaConfig, provider: MockChatProvider) -> Harness {
    let store = InMemoryStore::new();
    let supervisor = Arc::new(TaskSupervisor::new(Duration::from_secs(
        config.background.task_timeout_secs,
    )));
    let pipeline = MemoryPipeline::new(
        &config,
        Arc::new(provider.clone()),
        Arc::new(store.clone()),
        supervisor,
    );
    Harness {
        provider,
        store,
        pipeline,
    }
}

fn harness() -> Harness {
    harness_with(test_config())
}

fn turn(user_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::assistant("What do you do for a living?"),
        ChatMessage::user(user_text),
    ]
}

#[tokio::test]
async fn single_new_fact_is_saved() {
    let h = harness();
    h.provider.push_reply(r#"["用户是设计师"]"#).await;
    let user = UserId::from("u1");

    let outcome = h.pipeline.process_turn(Some(&user), &turn("我是设计师")).await;

    assert_eq!(outcome.status, TurnStatus::Success);
    assert_eq!(outcome.message(), "+1 saved, 0 updated");
    assert_eq!(outcome.net_count_delta(), 1);
    // extraction only: no candidates means no classifier call
    assert_eq!(h.provider.call_count().await, 1);

    let records = h.store.records("u1").await;
    assert_eq!(records.len(), 1);
    let (_, body) = parse_timestamp_prefix(&records[0].1).unwrap();
    assert_eq!(body, "用户是设计师");
}

#[tokio::test]
async fn update_replaces_candidate() {
    let h = harness();
    let user = UserId::from("u1");
    let old = h.store.seed("u1", "2026年01月01日09点00分：用户住在北京").await;

    h.provider.push_reply(r#"["用户搬到了上海"]"#).await;
    h.provider.push_reply("update").await;
    h.store
        .push_query_result(vec![StoredMemory {
            id: old.clone(),
            text: "2026年01月01日09点00分：用户住在北京".into(),
            distance: 0.18,
        }])
        .await;

    let outcome = h.pipeline.process_turn(Some(&user), &turn("我搬到上海了")).await;

    assert_eq!(outcome.message(), "+0 saved, 1 updated");
    assert_eq!(outcome.net_count_delta(), -1);

    let calls = h.store.calls().await;
    let delete_at = calls
        .iter()
        .position(|c| *c == StoreCall::Delete { user: "u1".into(), id: old.clone() })
        .unwrap();
    let add_at = calls
        .iter()
        .position(|c| matches!(c, StoreCall::Add { .. }))
        .unwrap();
    assert!(delete_at < add_at);

    let records = h.store.records("u1").await;
    assert_eq!(records.len(), 1);
    assert!(records[0].1.ends_with("：用户搬到了上海"));
}

#[tokio::test]
async fn duplicate_is_skipped() {
    let h = harness();
    let user = UserId::from("u1");
    h.provider.push_reply(r#"["likes tea"]"#).await;
    h.provider.push_reply("duplicate").await;
    h.store
        .push_query_result(vec![StoredMemory {
            id: "m1".into(),
            text: "likes tea".into(),
            distance: 0.02,
        }])
        .await;

    let outcome = h.pipeline.process_turn(Some(&user), &turn("I like tea")).await;
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.message(), "+0 saved, 0 updated");
    assert!(h.store.records("u1").await.is_empty());
}

#[tokio::test]
async fn candidates_below_threshold_do_not_reach_classifier() {
    let h = harness();
    let user = UserId::from("u1");
    h.provider.push_reply(r#"["likes tea"]"#).await;
    h.store
        .push_query_result(vec![StoredMemory {
            id: "m1".into(),
            text: "lives in Paris".into(),
            distance: 0.6,
        }])
        .await;

    let outcome = h.pipeline.process_turn(Some(&user), &turn("I like tea")).await;
    assert_eq!(outcome.saved, 1);
    assert_eq!(h.provider.call_count().await, 1);
}

#[tokio::test]
async fn empty_extraction_reports_no_new_facts() {
    let h = harness();
    h.provider.push_reply("[]").await;
    let outcome = h
        .pipeline
        .process_turn(Some(&UserId::from("u1")), &turn("hello"))
        .await;
    assert_eq!(outcome.message(), "no new facts");
    assert_eq!(h.store.call_count().await, 0);
}

#[tokio::test]
async fn one_failing_fact_does_not_stop_the_rest() {
    let h = harness();
    let user = UserId::from("u1");
    h.provider.push_reply(r#"["a", "b"]"#).await;
    h.store.push_query_error("store hiccup").await;

    let outcome = h.pipeline.process_turn(Some(&user), &turn("a and b")).await;
    // the failed lookup makes "a" new; "b" proceeds normally
    assert_eq!(outcome.saved, 2);
}

#[tokio::test]
async fn gating_skips_without_side_effects() {
    let h = harness();
    let user = UserId::from("u1");

    let outcome = h.pipeline.process_turn(None, &turn("I am a designer")).await;
    assert_eq!(outcome.status, TurnStatus::Skipped);

    let outcome = h
        .pipeline
        .process_turn(Some(&user), &[ChatMessage::user("only one")])
        .await;
    assert_eq!(outcome.status, TurnStatus::Skipped);
    assert_eq!(outcome.message(), "skipped");

    let mut config = test_config();
    config.memory.enabled = false;
    let disabled = harness_with(config);
    let outcome = disabled
        .pipeline
        .process_turn(Some(&user), &turn("I am a designer"))
        .await;
    assert_eq!(outcome.status, TurnStatus::Skipped);

    assert_eq!(h.provider.call_count().await, 0);
    assert_eq!(disabled.provider.call_count().await, 0);
    assert_eq!(h.store.call_count().await, 0);
}

#[tokio::test]
async fn period_saves_schedule_one_consolidation() {
    // test_config() sets the period to 3
    let h = harness();
    let user = UserId::from("u1");

    h.provider.push_reply(r#"["a", "b"]"#).await;
    h.pipeline.process_turn(Some(&user), &turn("a b")).await;
    assert_eq!(
        h.pipeline.tracker().snapshot(&user),
        ConsolidationState {
            counter: 2,
            in_flight: false
        }
    );
    assert_eq!(h.pipeline.supervisor().active_count(), 0);

    h.provider.push_reply(r#"["c"]"#).await;
    h.pipeline.process_turn(Some(&user), &turn("c")).await;

    let outcome = h.pipeline.supervisor().join_user(&user).await;
    assert_eq!(outcome, Some(TaskOutcome::Completed));
    assert_eq!(h.pipeline.tracker().snapshot(&user), ConsolidationState::default());
}

#[tokio::test]
async fn crossing_while_in_flight_is_absorbed() {
    let mut config = test_config();
    config.memory.summarize_after_n_memories = 1;
    let h = harness_with(config);
    let user = UserId::from("u1");

    // Hold the slot with an audit so the consolidation cannot start.
    let guard = h.pipeline.tracker().try_acquire_audit(&user).unwrap();

    h.provider.push_reply(r#"["a", "b"]"#).await;
    let outcome = h.pipeline.process_turn(Some(&user), &turn("a b")).await;
    assert_eq!(outcome.saved, 2);
    assert_eq!(h.pipeline.supervisor().active_count(), 0);
    assert_eq!(
        h.pipeline.tracker().snapshot(&user),
        ConsolidationState {
            counter: 0,
            in_flight: true
        }
    );
    drop(guard);
    assert!(!h.pipeline.tracker().snapshot(&user).in_flight);
}

#[tokio::test]
async fn audit_mode_dispatches_audit_instead_of_pipeline() {
    let mut config = test_config();
    config.memory.audit_mode = true;
    config.memory.audit_batch_size = 10;
    let h = harness_with(config);
    let user = UserId::from("u1");
    let junk = h.store.seed("u1", "assistant: how can I help").await;
    h.provider.push_reply(format!(r#"["{junk}"]"#)).await;

    let outcome = h.pipeline.process_turn(Some(&user), &turn("hi")).await;
    assert_eq!(outcome.status, TurnStatus::AuditScheduled);

    assert_eq!(
        h.pipeline.supervisor().join_user(&user).await,
        Some(TaskOutcome::Completed)
    );
    assert!(h.store.records("u1").await.is_empty());
    // audit prompt only; no extraction ran
    assert_eq!(h.provider.call_count().await, 1);
}

#[tokio::test]
async fn audit_mode_with_zero_batch_touches_nothing() {
    let mut config = test_config();
    config.memory.audit_mode = true;
    config.memory.audit_batch_size = 0;
    let h = harness_with(config);
    let user = UserId::from("u1");

    h.pipeline.process_turn(Some(&user), &turn("hi")).await;
    h.pipeline.supervisor().join_user(&user).await;

    assert_eq!(h.store.call_count().await, 0);
    assert_eq!(h.provider.call_count().await, 0);
}

#[tokio::test]
async fn audit_is_busy_while_consolidating() {
    let mut config = test_config();
    config.memory.audit_mode = true;
    let h = harness_with(config);
    let user = UserId::from("u1");
    let _held = h.pipeline.tracker().try_acquire_audit(&user).unwrap();

    let outcome = h.pipeline.process_turn(Some(&user), &turn("hi")).await;
    assert_eq!(outcome.status, TurnStatus::AuditBusy);
    assert_eq!(outcome.message(), "audit already running");
    assert!(h.pipeline.run_audit(&user, 10).await.is_err());
}

#[tokio::test]
async fn users_do_not_share_state() {
    let mut config = test_config();
    config.memory.summarize_after_n_memories = 2;
    let h = harness_with(config);
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");

    h.provider.push_reply(r#"["a"]"#).await;
    h.pipeline.process_turn(Some(&alice), &turn("a")).await;
    h.provider.push_reply(r#"["b"]"#).await;
    h.pipeline.process_turn(Some(&bob), &turn("b")).await;

    assert_eq!(h.pipeline.tracker().snapshot(&alice).counter, 1);
    assert_eq!(h.pipeline.tracker().snapshot(&bob).counter, 1);
    assert_eq!(h.store.records("alice").await.len(), 1);
    assert_eq!(h.store.records("bob").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_foreground_audit_times_out() {
    // test_config() bounds tasks at 5 seconds
    let h = harness_with_provider(
        test_config(),
        MockChatProvider::new().with_delay(Duration::from_secs(30)),
    );
    let user = UserId::from("u1");
    h.store.seed("u1", "2026年01月01日09点00分：likes tea").await;

    let err = h.pipeline.run_audit(&user, 10).await.unwrap_err();
    assert!(
        matches!(err, MemoriaError::Timeout { duration } if duration == Duration::from_secs(5))
    );
    assert!(!h.pipeline.tracker().snapshot(&user).in_flight);
    assert_eq!(h.store.records("u1").await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_background_audit_times_out_and_frees_slot() {
    let mut config = test_config();
    config.memory.audit_mode = true;
    config.memory.audit_batch_size = 10;
    let h = harness_with_provider(
        config,
        MockChatProvider::new().with_delay(Duration::from_secs(30)),
    );
    let user = UserId::from("u1");
    h.store.seed("u1", "2026年01月01日09点00分：likes tea").await;

    let outcome = h.pipeline.process_turn(Some(&user), &turn("hi")).await;
    assert_eq!(outcome.status, TurnStatus::AuditScheduled);
    assert_eq!(
        h.pipeline.supervisor().join_user(&user).await,
        Some(TaskOutcome::TimedOut)
    );
    assert!(!h.pipeline.tracker().snapshot(&user).in_flight);
    assert_eq!(h.store.records("u1").await.len(), 1);
}
