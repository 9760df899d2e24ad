// crates/sdstress-core/src/runtime/cancel.rs
// ============================================================================
// Module: sdstress Cancellation
// Description: Cooperative cancellation token with an interruptible sleep.
// Purpose: Let an interrupt wake the session pause and take the shutdown path.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The session loop only suspends in [`CancellationToken::sleep`]. The sleep
//! waits on a condition variable in bounded slices, so `cancel` from another
//! thread wakes it immediately and a missed notification costs at most one
//! slice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on a single condition-variable wait.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

// ============================================================================
// SECTION: Token
// ============================================================================

/// Shared cancellation flag.
///
/// # Invariants
/// - Once cancelled, a token never resets.
/// - Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Shared flag and wake-up signal.
    inner: Arc<CancelState>,
}

/// Flag plus the condition variable used to wake sleepers.
#[derive(Debug, Default)]
struct CancelState {
    /// True once cancellation was requested.
    cancelled: Mutex<bool>,
    /// Signalled on cancellation.
    wake: Condvar,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every sleeper.
    pub fn cancel(&self) {
        let mut cancelled =
            self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        drop(cancelled);
        self.inner.wake.notify_all();
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Returns true when the sleep ended because of cancellation.
    #[must_use]
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled =
            self.inner.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *cancelled {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let slice = remaining.min(SLEEP_SLICE);
            let (guard, _) = self
                .inner
                .wake
                .wait_timeout(cancelled, slice)
                .unwrap_or_else(PoisonError::into_inner);
            cancelled = guard;
        }
    }
}
