// crates/sdstress-core/src/runtime/session.rs
// ============================================================================
// Module: sdstress Stress Session
// Description: Single-threaded write/verify loop with a graceful finish path.
// Purpose: Drive continuous durable writes until cancelled or a hard failure.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! Each iteration prepares one record, inserts it, runs a verification pass
//! when the iteration count reaches a multiple of the verify interval, and
//! then pauses. The pause is the only suspension point and is interruptible.
//!
//! A failed insert is retried once with the same prepared record and a
//! `STORAGE_ERROR` event. A second failure ends the session. Every exit path
//! (cancellation, iteration limit, storage failure) runs a final
//! verification pass, builds the summary, appends `SESSION_END`, and logs the
//! summary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroU64;
use std::time::Duration;
use std::time::Instant;

use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::EventType;
use crate::core::NewEvent;
use crate::core::SessionSummary;
use crate::core::TestRecord;
use crate::interfaces::Clock;
use crate::interfaces::PayloadSource;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;
use crate::runtime::cancel::CancellationToken;
use crate::runtime::generator::WriteGenerator;
use crate::runtime::generator::submit_record;
use crate::runtime::report::SessionCounters;
use crate::runtime::report::log_summary;
use crate::runtime::report::summarize;
use crate::runtime::verifier::IntegrityVerifier;
use crate::runtime::verifier::VerifierConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default pause between iterations.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(10);
/// Default interval between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);
/// Default iterations between verification passes.
pub const DEFAULT_VERIFY_INTERVAL: NonZeroU64 = match NonZeroU64::new(100) {
    Some(value) => value,
    None => NonZeroU64::MIN,
};

// ============================================================================
// SECTION: Config
// ============================================================================

/// Session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause after each iteration.
    pub pause: Duration,
    /// Minimum time between progress log lines.
    pub progress_interval: Duration,
    /// Iterations between verification passes.
    pub verify_interval: NonZeroU64,
    /// Stop after this many iterations.
    pub max_iterations: Option<u64>,
    /// Verifier settings.
    pub verifier: VerifierConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pause: DEFAULT_PAUSE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            verify_interval: DEFAULT_VERIFY_INTERVAL,
            max_iterations: None,
            verifier: VerifierConfig::default(),
        }
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// An interrupt was requested.
    Cancelled,
    /// The configured iteration limit was reached.
    IterationLimit,
    /// An insert failed twice.
    StorageFailure(StoreError),
}

impl Termination {
    /// Returns true when the session ended because of a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }

    /// Returns a short description for logs and events.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Cancelled => "cancelled".to_string(),
            Self::IterationLimit => "iteration limit reached".to_string(),
            Self::StorageFailure(err) => format!("storage failure: {err}"),
        }
    }
}

/// Final session result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Why the session ended.
    pub termination: Termination,
    /// Summary built on the finish path.
    pub summary: SessionSummary,
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Write/verify loop over a record store.
#[derive(Debug)]
pub struct StressSession<'a, S, C, P> {
    /// Store under test.
    store: &'a S,
    /// Timestamp source.
    clock: C,
    /// Record generator.
    generator: WriteGenerator<P>,
    /// Checksum verifier.
    verifier: IntegrityVerifier,
    /// Session settings.
    config: SessionConfig,
    /// Completed iterations.
    iterations: u64,
    /// Acknowledged inserts.
    records_written: u64,
    /// Failed insert attempts.
    write_failures: u64,
}

impl<'a, S: RecordStore, C: Clock, P: PayloadSource> StressSession<'a, S, C, P> {
    /// Creates a session.
    #[must_use]
    pub const fn new(store: &'a S, clock: C, payloads: P, config: SessionConfig) -> Self {
        Self {
            store,
            clock,
            generator: WriteGenerator::new(payloads),
            verifier: IntegrityVerifier::new(config.verifier),
            config,
            iterations: 0,
            records_written: 0,
            write_failures: 0,
        }
    }

    /// Returns completed iterations.
    #[must_use]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Returns acknowledged inserts.
    #[must_use]
    pub const fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Runs until cancellation, the iteration limit, or a storage failure.
    pub fn run(&mut self, cancel: &CancellationToken) -> SessionOutcome {
        self.start();
        let mut last_progress = Instant::now();
        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if self.limit_reached() {
                break Termination::IterationLimit;
            }
            match self.write_with_retry() {
                Ok(record) => {
                    self.records_written += 1;
                    info!(
                        record_id = %record.id,
                        timestamp = %record.timestamp,
                        iteration = self.iterations + 1,
                        "record written"
                    );
                }
                Err(err) => break Termination::StorageFailure(err),
            }
            self.iterations += 1;

            if self.iterations % self.config.verify_interval.get() == 0 {
                self.run_verification();
            }
            if last_progress.elapsed() >= self.config.progress_interval {
                info!(
                    iterations = self.iterations,
                    records_written = self.records_written,
                    corrupt_tally = self.verifier.corrupt_tally(),
                    "progress"
                );
                last_progress = Instant::now();
            }
            if self.limit_reached() {
                break Termination::IterationLimit;
            }
            if cancel.sleep(self.config.pause) {
                break Termination::Cancelled;
            }
        };
        self.finish(termination)
    }

    /// Records `SESSION_START` and seeds the clock from stored data.
    fn start(&self) {
        match self.store.latest_record_timestamp() {
            Ok(Some(latest)) => self.clock.observe(latest),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "could not read latest record timestamp"),
        }
        let details = format!(
            "pause_ms={} verify_interval={} verify_scope={}",
            self.config.pause.as_millis(),
            self.config.verify_interval,
            self.config.verifier.scope.as_str()
        );
        info!(%details, "stress session started");
        self.append_event(EventType::SessionStart, details);
    }

    /// Prepares one record and inserts it, retrying the same record once.
    fn write_with_retry(&mut self) -> Result<TestRecord, StoreError> {
        let record = self.generator.prepare(&self.clock);
        let first = match submit_record(self.store, &record) {
            Ok(acknowledged) => return Ok(acknowledged),
            Err(err) => err,
        };
        self.write_failures += 1;
        let iteration = self.iterations + 1;
        warn!(iteration, error = %first, "record insert failed; retrying once");
        self.append_event(
            EventType::StorageError,
            format!("insert failed at iteration {iteration}: {first}; retrying"),
        );

        match submit_record(self.store, &record) {
            Ok(acknowledged) => Ok(acknowledged),
            Err(second) => {
                self.write_failures += 1;
                error!(iteration, error = %second, "record insert failed after retry");
                self.append_event(
                    EventType::StorageError,
                    format!("insert failed at iteration {iteration} after retry: {second}"),
                );
                Err(second)
            }
        }
    }

    /// Runs one verification pass; failures are logged only.
    fn run_verification(&mut self) {
        if let Err(err) = self.verifier.verify_batch(self.store, &self.clock, self.iterations) {
            error!(iteration = self.iterations, error = %err, "verification pass failed");
        }
    }

    /// Returns true once the iteration limit is reached.
    fn limit_reached(&self) -> bool {
        self.config.max_iterations.is_some_and(|limit| self.iterations >= limit)
    }

    /// Final verification, summary, `SESSION_END`, and summary log.
    fn finish(&mut self, termination: Termination) -> SessionOutcome {
        match &termination {
            Termination::StorageFailure(err) => {
                error!(iterations = self.iterations, error = %err, "stress session stopping");
            }
            other => {
                info!(iterations = self.iterations, reason = %other.describe(), "stress session stopping");
            }
        }
        self.run_verification();
        let summary = summarize(self.store, self.counters());
        self.append_event(EventType::SessionEnd, format!("{}; {summary}", termination.describe()));
        log_summary(&summary);
        SessionOutcome {
            termination,
            summary,
        }
    }

    /// Returns the session counters.
    fn counters(&self) -> SessionCounters {
        SessionCounters {
            records_written: self.records_written,
            iterations: self.iterations,
            verification_passes: self.verifier.passes(),
            write_failures: self.write_failures,
            corrupt_record_count: self.verifier.corrupt_tally(),
        }
    }

    /// Appends an event, logging instead of failing on error.
    fn append_event(&self, event_type: EventType, details: String) {
        let event = NewEvent::new(self.clock.now(), event_type, details);
        if let Err(err) = self.store.append_event(&event) {
            warn!(event_type = %event_type, error = %err, "failed to append system event");
        }
    }
}
