// crates/sdstress-core/src/core/records.rs
// ============================================================================
// Module: sdstress Records
// Description: Test records and system events persisted by the harness.
// Purpose: Define write-side and read-side shapes of the two persisted tables.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Two tables are persisted. `test_data` holds checksummed payload rows that
//! are written once and never mutated in place. `system_events` is an
//! append-only audit trail of session and maintenance milestones.
//!
//! Write-side types ([`NewRecord`], [`NewEvent`]) carry everything except the
//! store-assigned id. The read-side [`StoredRecord`] keeps raw column contents
//! so a damaged row can still be reported instead of failing the whole scan.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::EventId;
use crate::core::identifiers::RecordId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Test Records
// ============================================================================

/// Record prepared for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Creation time.
    pub timestamp: Timestamp,
    /// Random payload text.
    pub value: String,
    /// Digest of `value` at write time.
    pub checksum: String,
}

/// Record acknowledged by the store.
///
/// # Invariants
/// - `checksum` equals the digest of `value` for the lifetime of the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Creation time.
    pub timestamp: Timestamp,
    /// Random payload text.
    pub value: String,
    /// Digest of `value` at write time.
    pub checksum: String,
}

impl TestRecord {
    /// Builds the acknowledged record from a prepared record and its id.
    #[must_use]
    pub fn acknowledged(id: RecordId, record: NewRecord) -> Self {
        Self {
            id,
            timestamp: record.timestamp,
            value: record.value,
            checksum: record.checksum,
        }
    }
}

/// Payload column contents as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Value decoded as text.
    Text(String),
    /// Value could not be decoded (wrong type, invalid UTF-8, or NULL).
    Unreadable(String),
}

/// Record row as scanned from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// Raw persisted timestamp text.
    pub timestamp: String,
    /// Payload column contents.
    pub value: StoredValue,
    /// Stored checksum text, `None` when the column is NULL or not text.
    pub checksum: Option<String>,
}

// ============================================================================
// SECTION: System Events
// ============================================================================

/// Audit event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A stress session started writing.
    SessionStart,
    /// Power-on maintenance completed.
    PowerOn,
    /// A maintenance stage or recovery attempt failed.
    MaintenanceError,
    /// A record checksum mismatch was found.
    CorruptionDetected,
    /// A stress session finished.
    SessionEnd,
    /// Free space fell below the warning threshold.
    LowSpace,
    /// A record insert failed.
    StorageError,
}

impl EventType {
    /// Returns the persisted label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "SESSION_START",
            Self::PowerOn => "POWER_ON",
            Self::MaintenanceError => "MAINTENANCE_ERROR",
            Self::CorruptionDetected => "CORRUPTION_DETECTED",
            Self::SessionEnd => "SESSION_END",
            Self::LowSpace => "LOW_SPACE",
            Self::StorageError => "STORAGE_ERROR",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SESSION_START" => Ok(Self::SessionStart),
            "POWER_ON" => Ok(Self::PowerOn),
            "MAINTENANCE_ERROR" => Ok(Self::MaintenanceError),
            "CORRUPTION_DETECTED" => Ok(Self::CorruptionDetected),
            "SESSION_END" => Ok(Self::SessionEnd),
            "LOW_SPACE" => Ok(Self::LowSpace),
            "STORAGE_ERROR" => Ok(Self::StorageError),
            other => Err(format!("unknown event type: {other}")),
        }
    }
}

/// Event prepared for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Event time.
    pub timestamp: Timestamp,
    /// Event classification.
    pub event_type: EventType,
    /// Free-form diagnostic text.
    pub details: String,
}

impl NewEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(timestamp: Timestamp, event_type: EventType, details: impl Into<String>) -> Self {
        Self {
            timestamp,
            event_type,
            details: details.into(),
        }
    }
}

/// Event row as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemEvent {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Raw persisted timestamp text.
    pub timestamp: String,
    /// Event classification, `Err` with the raw label when unrecognized.
    pub event_type: Result<EventType, String>,
    /// Free-form diagnostic text.
    pub details: String,
}

impl SystemEvent {
    /// Returns true when the event has the given type.
    #[must_use]
    pub fn is(&self, event_type: EventType) -> bool {
        self.event_type.as_ref().is_ok_and(|value| *value == event_type)
    }
}
