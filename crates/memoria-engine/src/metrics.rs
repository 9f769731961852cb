// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is
//! a no-op.

use metrics::{describe_counter, describe_histogram};

use crate::types::Action;

/// Register all Memoria metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "memoria_facts_extracted_total",
        "Facts returned by the extractor"
    );
    describe_counter!("memoria_facts_total", "Processed facts by action");
    describe_counter!(
        "memoria_consolidations_total",
        "Background tasks by kind and outcome"
    );
    describe_counter!(
        "memoria_audit_deleted_total",
        "Memories deleted by the retroactive audit"
    );
    describe_histogram!(
        "memoria_turn_duration_seconds",
        "Per-turn pipeline duration in seconds"
    );
}

pub fn record_extracted(count: usize) {
    metrics::counter!("memoria_facts_extracted_total").increment(count as u64);
}

pub fn record_fact(action: Action) {
    let label: &'static str = action.into();
    metrics::counter!("memoria_facts_total", "action" => label).increment(1);
}

/// Record a finished background task.
pub fn record_task(kind: &'static str, outcome: &'static str) {
    metrics::counter!("memoria_consolidations_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

pub fn record_audit_deleted(count: usize) {
    metrics::counter!("memoria_audit_deleted_total").increment(count as u64);
}

pub fn record_turn_duration(seconds: f64) {
    metrics::histogram!("memoria_turn_duration_seconds").record(seconds);
}
