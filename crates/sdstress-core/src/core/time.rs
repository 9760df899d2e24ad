// crates/sdstress-core/src/core/time.rs
// ============================================================================
// Module: sdstress Time Model
// Description: Millisecond timestamps with a fixed-width persisted text form.
// Purpose: Timestamp records and events so inspectors can read them directly.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Timestamps are unix epoch milliseconds. They persist as fixed-width UTC
//! text (`YYYY-MM-DDTHH:MM:SS.mmmZ`), so lexical order of the stored column
//! equals chronological order. The runtime never reads wall-clock time
//! directly; it goes through the [`crate::interfaces::Clock`] interface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Persisted timestamp layout.
const PERSISTED_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);
/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch milliseconds.
///
/// # Invariants
/// - Values before 1970 are representable but never produced by the system clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp advanced by one millisecond.
    #[must_use]
    pub const fn next_millisecond(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Renders the persisted text form.
    ///
    /// Falls back to the raw millisecond count when the value is outside the
    /// calendar range supported by the formatter.
    #[must_use]
    pub fn to_persisted(self) -> String {
        let nanos = i128::from(self.0) * NANOS_PER_MILLI;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()
            .and_then(|value| value.format(PERSISTED_FORMAT).ok())
            .unwrap_or_else(|| self.0.to_string())
    }

    /// Parses the persisted text form.
    #[must_use]
    pub fn parse_persisted(text: &str) -> Option<Self> {
        let parsed = PrimitiveDateTime::parse(text, PERSISTED_FORMAT).ok()?.assume_utc();
        let millis = parsed.unix_timestamp_nanos() / NANOS_PER_MILLI;
        i64::try_from(millis).ok().map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_persisted())
    }
}
