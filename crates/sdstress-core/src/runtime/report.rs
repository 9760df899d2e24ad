// crates/sdstress-core/src/runtime/report.rs
// ============================================================================
// Module: sdstress Reporter
// Description: Builds and logs the session summary.
// Purpose: Produce the final report on every exit path.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The summary combines store-derived statistics with session counters. Store
//! queries that fail are logged and leave the matching field unset, so a
//! summary is always produced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;
use tracing::warn;

use crate::core::SessionSummary;
use crate::interfaces::RecordStore;

// ============================================================================
// SECTION: Counters
// ============================================================================

/// Session-local statistics folded into the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCounters {
    /// Records written this session.
    pub records_written: u64,
    /// Completed iterations.
    pub iterations: u64,
    /// Verification passes run.
    pub verification_passes: u64,
    /// Failed insert attempts.
    pub write_failures: u64,
    /// Distinct corrupt records detected.
    pub corrupt_record_count: u64,
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Builds a summary from the store and session counters.
pub fn summarize<S: RecordStore>(store: &S, counters: SessionCounters) -> SessionSummary {
    let total_records = store
        .count_records()
        .inspect_err(|err| warn!(error = %err, "summary: record count unavailable"))
        .ok();
    let span = store
        .record_span()
        .inspect_err(|err| warn!(error = %err, "summary: record span unavailable"))
        .ok()
        .flatten();
    let database_size_bytes = store
        .size_bytes()
        .inspect_err(|err| warn!(error = %err, "summary: database size unavailable"))
        .ok();
    let (first_record_timestamp, last_record_timestamp) = match span {
        Some((first, last)) => (Some(first), Some(last)),
        None => (None, None),
    };
    SessionSummary {
        total_records,
        first_record_timestamp,
        last_record_timestamp,
        database_size_bytes,
        corrupt_record_count: counters.corrupt_record_count,
        records_written: counters.records_written,
        iterations: counters.iterations,
        verification_passes: counters.verification_passes,
        write_failures: counters.write_failures,
    }
}

/// Logs the summary as a block of lines.
pub fn log_summary(summary: &SessionSummary) {
    info!("===== session summary =====");
    match summary.total_records {
        Some(total) => info!("total records: {total}"),
        None => info!("total records: unknown"),
    }
    info!(
        "first record: {}",
        summary.first_record_timestamp.as_deref().unwrap_or("none")
    );
    info!(
        "last record: {}",
        summary.last_record_timestamp.as_deref().unwrap_or("none")
    );
    match summary.database_size_mb() {
        Some(size) => info!("database size: {size:.2} MB"),
        None => info!("database size: unknown"),
    }
    info!("corrupt records: {}", summary.corrupt_record_count);
    info!(
        "records written: {} over {} iterations ({} verification passes, {} write failures)",
        summary.records_written,
        summary.iterations,
        summary.verification_passes,
        summary.write_failures
    );
    info!("===========================");
}
