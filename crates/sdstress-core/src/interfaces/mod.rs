// crates/sdstress-core/src/interfaces/mod.rs
// ============================================================================
// Module: sdstress Interfaces
// Description: Backend-agnostic contracts for storage, time, and payloads.
// Purpose: Define the collaborator surfaces the harness runtime drives.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The runtime never talks to a storage engine directly. It drives a
//! [`RecordStore`], reads time from a [`Clock`], and draws payloads from a
//! [`PayloadSource`]. All schema-mutating store operations must be idempotent
//! so a store that is already initialized, or is open in an external
//! inspector, is never damaged by a restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

use crate::core::EventId;
use crate::core::NewEvent;
use crate::core::NewRecord;
use crate::core::RecordId;
use crate::core::StoredRecord;
use crate::core::SystemEvent;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Store Reports
// ============================================================================

/// Result of an engine-level structural integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Engine diagnostics; empty when the store is consistent.
    pub problems: Vec<String>,
}

impl IntegrityReport {
    /// Returns a report for a consistent store.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            problems: Vec::new(),
        }
    }

    /// Returns true when no problems were reported.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Result of flushing write-ahead artifacts into the main store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckpointReport {
    /// True when the checkpoint could not complete because of other readers.
    pub busy: bool,
    /// Frames present in the write-ahead log before the checkpoint.
    pub log_frames: i64,
    /// Frames merged into the main store file.
    pub checkpointed_frames: i64,
}

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Record store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store I/O error.
    #[error("record store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails structural checks.
    #[error("record store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("record store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data or arguments are invalid.
    #[error("record store invalid data: {0}")]
    Invalid(String),
    /// Store is opened read-only and refused a mutation.
    #[error("record store is read-only: {0}")]
    ReadOnly(String),
    /// Store engine reported an error.
    #[error("record store error: {0}")]
    Store(String),
}

/// Minimal contract over the embedded engine.
///
/// # Invariants
/// - `ensure_schema` is idempotent.
/// - Record and event ids are strictly increasing and never reused.
/// - `scan_records` returns rows in ascending id order.
/// - `remove_transient_files` never removes the primary store file.
pub trait RecordStore {
    /// Creates the `test_data` and `system_events` tables when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the schema cannot be created or validated.
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Inserts a record and returns its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert is not acknowledged.
    fn insert_record(&self, record: &NewRecord) -> Result<RecordId, StoreError>;

    /// Scans up to `limit` records with ids greater than `after`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the scan fails.
    fn scan_records(
        &self,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Counts stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the count fails.
    fn count_records(&self) -> Result<u64, StoreError>;

    /// Returns the persisted timestamps of the oldest and newest records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn record_span(&self) -> Result<Option<(String, String)>, StoreError>;

    /// Returns the newest record timestamp, when one parses.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn latest_record_timestamp(&self) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.record_span()?.and_then(|(_, last)| Timestamp::parse_persisted(&last)))
    }

    /// Appends a system event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert is not acknowledged.
    fn append_event(&self, event: &NewEvent) -> Result<EventId, StoreError>;

    /// Lists all system events in id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the scan fails.
    fn list_events(&self) -> Result<Vec<SystemEvent>, StoreError>;

    /// Runs the engine's structural integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the check itself cannot run.
    fn integrity_check(&self) -> Result<IntegrityReport, StoreError>;

    /// Flushes write-ahead artifacts into the main store file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the checkpoint fails.
    fn checkpoint(&self) -> Result<CheckpointReport, StoreError>;

    /// Removes inert side files left by an unclean shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a side file exists but cannot be removed.
    fn remove_transient_files(&self) -> Result<Vec<PathBuf>, StoreError>;

    /// Makes a single bounded repair attempt.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is still inconsistent afterwards.
    fn recover(&self) -> Result<(), StoreError>;

    /// Returns the logical store size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the size cannot be determined.
    fn size_bytes(&self) -> Result<u64, StoreError>;

    /// Returns free bytes on the volume holding the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the volume cannot be queried.
    fn available_space_bytes(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic timestamp source.
///
/// # Invariants
/// - Successive calls return strictly increasing timestamps.
pub trait Clock {
    /// Returns the next timestamp.
    fn now(&self) -> Timestamp;

    /// Raises the clock floor so later timestamps sort after `timestamp`.
    fn observe(&self, timestamp: Timestamp);
}

// ============================================================================
// SECTION: Payload Source
// ============================================================================

/// Source of pseudo-random record payloads.
pub trait PayloadSource {
    /// Returns the next payload.
    fn next_payload(&mut self) -> String;
}
