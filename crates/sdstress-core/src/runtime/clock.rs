// crates/sdstress-core/src/runtime/clock.rs
// ============================================================================
// Module: sdstress System Clock
// Description: Wall-clock timestamps forced to be strictly increasing.
// Purpose: Keep record timestamps ordered even if the device clock steps back.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Embedded targets often boot without a battery-backed clock, so wall time
//! can jump backwards between sessions. [`SystemClock`] issues the wall time
//! unless it is not after the last issued (or observed) timestamp, in which
//! case it issues one millisecond past it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic wall clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    /// Last issued or observed unix milliseconds.
    floor: Arc<AtomicI64>,
}

impl SystemClock {
    /// Creates a clock with no floor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = unix_millis();
        let mut issued = wall;
        let _ = self.floor.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            issued = wall.max(last.saturating_add(1));
            Some(issued)
        });
        Timestamp::from_unix_millis(issued)
    }

    fn observe(&self, timestamp: Timestamp) {
        self.floor.fetch_max(timestamp.as_unix_millis(), Ordering::AcqRel);
    }
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
