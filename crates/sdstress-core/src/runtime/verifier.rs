// crates/sdstress-core/src/runtime/verifier.rs
// ============================================================================
// Module: sdstress Integrity Verifier
// Description: Re-reads stored records and compares recomputed checksums.
// Purpose: Detect silent corruption of rows the store already acknowledged.
// Dependencies: crate::{core, interfaces}, serde, tracing
// ============================================================================

//! ## Overview
//! A verification pass scans `test_data` in ascending id order, one page at a
//! time, recomputes each payload digest, and compares it with the stored
//! checksum. Rows whose value cannot be decoded, or whose checksum is missing,
//! count as corrupt. Corrupt ids are tracked as a set, so the tally is the
//! number of distinct corrupt records seen in this session, and each id is
//! reported with a `CORRUPTION_DETECTED` event exactly once.
//!
//! In [`VerifyScope::Incremental`] mode the verifier remembers the highest id
//! it has checked and later passes resume after it; every record is still
//! checked at least once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::EventType;
use crate::core::NewEvent;
use crate::core::RecordId;
use crate::core::StoredRecord;
use crate::core::hashing::digest_stored_value;
use crate::interfaces::Clock;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of rows read per scan page.
pub const DEFAULT_VERIFY_PAGE_SIZE: usize = 500;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Which records a verification pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyScope {
    /// Every stored record, every pass.
    #[default]
    Full,
    /// Only records newer than the previous pass's high-water mark.
    Incremental,
}

impl VerifyScope {
    /// Returns the configuration label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

/// Verifier settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Records covered per pass.
    pub scope: VerifyScope,
    /// Rows read per scan page.
    pub page_size: usize,
    /// Append `CORRUPTION_DETECTED` events for newly corrupt records.
    pub record_events: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            scope: VerifyScope::Full,
            page_size: DEFAULT_VERIFY_PAGE_SIZE,
            record_events: true,
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of one verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationReport {
    /// Iteration at which the pass ran.
    pub iteration: u64,
    /// Records checked in this pass.
    pub checked: u64,
    /// Ids that failed verification in this pass.
    pub mismatched: Vec<RecordId>,
    /// Ids that failed verification for the first time this session.
    pub newly_corrupt: Vec<RecordId>,
    /// Distinct corrupt ids seen this session, after this pass.
    pub corrupt_tally: u64,
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Stateful checksum verifier for one session.
///
/// # Invariants
/// - `corrupt_ids` only grows during a session.
/// - `high_water` never decreases.
#[derive(Debug, Clone, Default)]
pub struct IntegrityVerifier {
    /// Verifier settings.
    config: VerifierConfig,
    /// Highest record id checked so far.
    high_water: Option<RecordId>,
    /// Distinct corrupt ids detected this session.
    corrupt_ids: BTreeSet<RecordId>,
    /// Completed passes.
    passes: u64,
}

impl IntegrityVerifier {
    /// Creates a verifier with an empty tally.
    #[must_use]
    pub const fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            high_water: None,
            corrupt_ids: BTreeSet::new(),
            passes: 0,
        }
    }

    /// Returns the distinct corrupt record count.
    #[must_use]
    pub fn corrupt_tally(&self) -> u64 {
        u64::try_from(self.corrupt_ids.len()).unwrap_or(u64::MAX)
    }

    /// Returns the distinct corrupt record ids.
    #[must_use]
    pub const fn corrupt_ids(&self) -> &BTreeSet<RecordId> {
        &self.corrupt_ids
    }

    /// Returns the number of completed passes.
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Returns the highest record id checked so far.
    #[must_use]
    pub const fn high_water(&self) -> Option<RecordId> {
        self.high_water
    }

    /// Runs one verification pass.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a scan page cannot be read. Corruption
    /// found before the failing page stays in the tally.
    pub fn verify_batch<S: RecordStore, C: Clock>(
        &mut self,
        store: &S,
        clock: &C,
        iteration: u64,
    ) -> Result<VerificationReport, StoreError> {
        let page_size = self.config.page_size.max(1);
        let mut cursor = match self.config.scope {
            VerifyScope::Full => None,
            VerifyScope::Incremental => self.high_water,
        };
        let mut report = VerificationReport {
            iteration,
            ..VerificationReport::default()
        };

        loop {
            let page = store.scan_records(cursor, page_size)?;
            for record in &page {
                report.checked += 1;
                cursor = Some(record.id);
                let Some(problem) = inspect_record(record) else {
                    continue;
                };
                report.mismatched.push(record.id);
                error!(record_id = %record.id, timestamp = %record.timestamp, problem = %problem, "integrity error detected");
                if self.corrupt_ids.insert(record.id) {
                    report.newly_corrupt.push(record.id);
                    if self.config.record_events {
                        record_corruption(store, clock, record.id, &problem);
                    }
                }
            }
            if page.len() < page_size {
                break;
            }
        }

        self.high_water = self.high_water.max(cursor);
        self.passes += 1;
        report.corrupt_tally = self.corrupt_tally();
        info!(
            iteration,
            checked = report.checked,
            mismatched = report.mismatched.len(),
            newly_corrupt = report.newly_corrupt.len(),
            corrupt_tally = report.corrupt_tally,
            scope = self.config.scope.as_str(),
            "verification pass complete"
        );
        Ok(report)
    }
}

/// Returns a description of the defect, or `None` when the record verifies.
fn inspect_record(record: &StoredRecord) -> Option<String> {
    let digest = match digest_stored_value(&record.value) {
        Ok(digest) => digest,
        Err(err) => return Some(format!("unreadable value: {err}")),
    };
    match record.checksum.as_deref() {
        None => Some(format!("missing checksum; calculated {}", digest.value)),
        Some(stored) if digest.matches(stored) => None,
        Some(stored) => Some(format!("checksum mismatch: stored {stored}, calculated {}", digest.value)),
    }
}

/// Appends a `CORRUPTION_DETECTED` event; failures are logged only.
fn record_corruption<S: RecordStore, C: Clock>(
    store: &S,
    clock: &C,
    id: RecordId,
    problem: &str,
) {
    let event = NewEvent::new(
        clock.now(),
        EventType::CorruptionDetected,
        format!("record {id}: {problem}"),
    );
    if let Err(err) = store.append_event(&event) {
        warn!(record_id = %id, error = %err, "failed to record corruption event");
    }
}
