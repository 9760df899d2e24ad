// crates/sdstress-core/src/core/summary.rs
// ============================================================================
// Module: sdstress Session Summary
// Description: Read projection reported when a session ends.
// Purpose: Give operators record counts and corruption tally on every exit.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SessionSummary`] is derived on demand from the store plus the session's
//! own counters. It is never persisted as its own entity; the `SESSION_END`
//! event carries its rendered text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bytes per mebibyte for size reporting.
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Final report for a session segment.
///
/// # Invariants
/// - Store-derived fields are `None` when the store could not be queried.
/// - `corrupt_record_count` counts distinct corrupt record ids seen this session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Rows in `test_data` at the end of the session.
    pub total_records: Option<u64>,
    /// Persisted timestamp of the oldest record.
    pub first_record_timestamp: Option<String>,
    /// Persisted timestamp of the newest record.
    pub last_record_timestamp: Option<String>,
    /// Logical database size in bytes.
    pub database_size_bytes: Option<u64>,
    /// Distinct corrupt records detected during the session.
    pub corrupt_record_count: u64,
    /// Records written during this session segment.
    pub records_written: u64,
    /// Completed write iterations.
    pub iterations: u64,
    /// Verification passes run, including the final pass.
    pub verification_passes: u64,
    /// Insert attempts that failed.
    pub write_failures: u64,
}

impl SessionSummary {
    /// Returns the database size in mebibytes.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Size is reported to two decimals only.")]
    pub fn database_size_mb(&self) -> Option<f64> {
        self.database_size_bytes.map(|bytes| bytes as f64 / BYTES_PER_MB)
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unknown = "unknown";
        match self.total_records {
            Some(total) => write!(f, "total_records={total}")?,
            None => write!(f, "total_records={unknown}")?,
        }
        write!(
            f,
            " first_record={} last_record={}",
            self.first_record_timestamp.as_deref().unwrap_or("none"),
            self.last_record_timestamp.as_deref().unwrap_or("none"),
        )?;
        match self.database_size_mb() {
            Some(size) => write!(f, " size_mb={size:.2}")?,
            None => write!(f, " size_mb={unknown}")?,
        }
        write!(
            f,
            " corrupt_record_count={} records_written={} iterations={} verification_passes={} \
             write_failures={}",
            self.corrupt_record_count,
            self.records_written,
            self.iterations,
            self.verification_passes,
            self.write_failures,
        )
    }
}
