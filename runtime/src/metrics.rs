//! Metrics for the write pipeline, read path and authorization gate.
//!
//! Metrics are recorded through the `metrics` facade. Installing an exporter is up to
//! the host process; without one, recording is a no-op.
//!
//! # Example
//!
//! ```rust
//! use strata_runtime::metrics::describe_metrics;
//!
//! // Once at startup, after installing a recorder.
//! describe_metrics();
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Events committed to the log, labelled by entity type.
pub const EVENTS_COMMITTED: &str = "strata_events_committed_total";

/// Submissions refused before commit, labelled by reason.
pub const EVENTS_REJECTED: &str = "strata_events_rejected_total";

/// Commits refused because the stream moved on.
pub const CONCURRENCY_CONFLICTS: &str = "strata_concurrency_conflicts_total";

/// Submissions denied by the authorization gate.
pub const AUTHORIZATION_DENIED: &str = "strata_authorization_denied_total";

/// Number of events folded per replay.
pub const REPLAY_EVENTS: &str = "strata_replay_events";

/// Register descriptions for every metric the engine records.
pub fn describe_metrics() {
    describe_counter!(EVENTS_COMMITTED, "Total number of events committed to the log");
    describe_counter!(
        EVENTS_REJECTED,
        "Total number of submissions rejected before commit"
    );
    describe_counter!(
        CONCURRENCY_CONFLICTS,
        "Total number of commits refused by the log's version check"
    );
    describe_counter!(
        AUTHORIZATION_DENIED,
        "Total number of submissions denied by the authorization gate"
    );
    describe_histogram!(REPLAY_EVENTS, "Number of events folded to build a projection");
}

pub(crate) fn record_commit(entity_type: &str) {
    counter!(EVENTS_COMMITTED, "entity_type" => entity_type.to_string()).increment(1);
}

pub(crate) fn record_rejection(reason: &'static str) {
    counter!(EVENTS_REJECTED, "reason" => reason).increment(1);
}

pub(crate) fn record_conflict() {
    counter!(CONCURRENCY_CONFLICTS).increment(1);
}

pub(crate) fn record_denial() {
    counter!(AUTHORIZATION_DENIED).increment(1);
}

#[allow(clippy::cast_precision_loss)] // Stream lengths stay far below 2^52
pub(crate) fn record_replay(event_count: usize) {
    histogram!(REPLAY_EVENTS).record(event_count as f64);
}
