// crates/sdstress-core/src/core/identifiers.rs
// ============================================================================
// Module: sdstress Identifiers
// Description: Store-assigned identifiers for records and events.
// Purpose: Keep record and event row ids from being mixed up.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are assigned by the record store on insert. They are strictly
//! increasing within a table and never reused, so ordering by identifier is
//! insertion order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier of a persisted test record.
///
/// # Invariants
/// - Always >= 1 (row ids start at one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Creates a record identifier from a raw row id (returns `None` below one).
    #[must_use]
    pub const fn from_raw(raw: i64) -> Option<Self> {
        if raw >= 1 { Some(Self(raw)) } else { None }
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a persisted system event.
///
/// # Invariants
/// - Always >= 1 (row ids start at one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Creates an event identifier from a raw row id (returns `None` below one).
    #[must_use]
    pub const fn from_raw(raw: i64) -> Option<Self> {
        if raw >= 1 { Some(Self(raw)) } else { None }
    }

    /// Returns the raw row id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
