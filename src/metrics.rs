// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Transaction buffering (entries buffered, finalized, purged)
//! - Retry and reconnect activity against the destination
//! - applyOps batch outcomes
//! - Index build fallbacks
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `oplog_mirror_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! # Usage
//!
//! ```rust,no_run
//! use oplog_mirror::metrics;
//! use std::time::Duration;
//!
//! metrics::record_apply_ops_batch(42, true, Duration::from_millis(12));
//! metrics::record_retry("insert", "reconnectable");
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// =============================================================================
// Transaction Buffer Metrics
// =============================================================================

/// Record one entry appended to a transaction's buffered state.
pub fn record_txn_entry_buffered(role: &str) {
    counter!("oplog_mirror_txn_entries_buffered_total", "role" => role.to_string()).increment(1);
}

/// Record a transaction reaching its final entry.
pub fn record_txn_finalized(outcome: &str, entries: usize) {
    counter!("oplog_mirror_txn_finalized_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("oplog_mirror_txn_entries", "outcome" => outcome.to_string()).record(entries as f64);
}

/// Record a purge that removed state.
pub fn record_txn_purged() {
    counter!("oplog_mirror_txn_purged_total").increment(1);
}

/// Gauge for transactions currently held in the buffer.
pub fn set_active_txns(count: usize) {
    gauge!("oplog_mirror_active_txns").set(count as f64);
}

/// Record inner operations streamed from a committed transaction.
pub fn record_txn_ops_streamed(count: usize) {
    counter!("oplog_mirror_txn_ops_streamed_total").increment(count as u64);
}

// =============================================================================
// Retry / Reconnect Metrics
// =============================================================================

/// Record a failed attempt that will be retried.
pub fn record_retry(operation: &str, kind: &str) {
    counter!(
        "oplog_mirror_retries_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a retry loop that ran out of attempts and time.
pub fn record_retries_exhausted(operation: &str, elapsed: Duration) {
    counter!("oplog_mirror_retries_exhausted_total", "operation" => operation.to_string()).increment(1);
    histogram!("oplog_mirror_retry_loop_duration_seconds", "operation" => operation.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record a session recovery probe outcome.
pub fn record_reconnect_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("oplog_mirror_reconnect_attempts_total", "status" => status).increment(1);
}

// =============================================================================
// Apply Metrics
// =============================================================================

/// Record an applyOps batch sent to the destination.
pub fn record_apply_ops_batch(ops: usize, success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("oplog_mirror_apply_ops_batches_total", "status" => status).increment(1);
    if success {
        counter!("oplog_mirror_apply_ops_entries_total").increment(ops as u64);
    }
    histogram!("oplog_mirror_apply_ops_batch_size").record(ops as f64);
    histogram!("oplog_mirror_apply_ops_duration_seconds").record(duration.as_secs_f64());
}

/// Record documents inserted one at a time after a duplicate-key failure.
pub fn record_duplicate_key_fallback(docs: usize) {
    counter!("oplog_mirror_duplicate_key_fallbacks_total").increment(1);
    counter!("oplog_mirror_duplicate_key_single_inserts_total").increment(docs as u64);
}

/// Record an index build that fell back to per-index applyOps.
pub fn record_index_fallback(ns: &str, indexes: usize) {
    counter!("oplog_mirror_index_fallbacks_total", "ns" => ns.to_string()).increment(1);
    counter!("oplog_mirror_index_fallback_builds_total").increment(indexes as u64);
}

/// Record a command against the destination by name and outcome.
pub fn record_command(command: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "oplog_mirror_commands_total",
        "command" => command.to_string(),
        "status" => status
    )
    .increment(1);
}
