// crates/sdstress-core/src/runtime/maintenance.rs
// ============================================================================
// Module: sdstress Power-On Maintenance
// Description: Startup routine that checks, flushes, and prepares the store.
// Purpose: Bring the store to a known-good state before writes begin.
// Dependencies: crate::{core, interfaces}, thiserror, tracing
// ============================================================================

//! ## Overview
//! Maintenance is a linear state machine:
//! `Open -> ConsistencyCheck -> Checkpoint -> Cleanup -> SpaceCheck -> Record`.
//! When a stage fails, a `MAINTENANCE_ERROR` event is appended, the store
//! makes one bounded recovery attempt, and the failed stage is retried. A
//! second failure, or a failed recovery, aborts maintenance and the session
//! must not start.
//!
//! Free space below the warning threshold appends a `LOW_SPACE` event and
//! continues; free space below the fatal threshold fails the stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::EventId;
use crate::core::EventType;
use crate::core::NewEvent;
use crate::interfaces::CheckpointReport;
use crate::interfaces::Clock;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default free-space warning threshold in mebibytes.
pub const DEFAULT_MIN_FREE_SPACE_MB: u64 = 100;
/// Default free-space floor below which maintenance fails.
pub const DEFAULT_FATAL_FREE_SPACE_BYTES: u64 = 1024 * 1024;
/// Bytes per mebibyte.
const BYTES_PER_MB: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Maintenance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Free bytes below which a `LOW_SPACE` warning is recorded.
    pub min_free_space_bytes: u64,
    /// Free bytes below which maintenance fails.
    pub fatal_free_space_bytes: u64,
}

impl MaintenanceConfig {
    /// Builds thresholds from a warning level in mebibytes.
    #[must_use]
    pub const fn with_min_free_space_mb(min_free_space_mb: u64) -> Self {
        Self {
            min_free_space_bytes: min_free_space_mb.saturating_mul(BYTES_PER_MB),
            fatal_free_space_bytes: DEFAULT_FATAL_FREE_SPACE_BYTES,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self::with_min_free_space_mb(DEFAULT_MIN_FREE_SPACE_MB)
    }
}

// ============================================================================
// SECTION: Stages
// ============================================================================

/// Maintenance stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceStage {
    /// Open the store and ensure the schema exists.
    Open,
    /// Run the engine's structural integrity check.
    ConsistencyCheck,
    /// Flush write-ahead artifacts into the main file.
    Checkpoint,
    /// Remove inert side files.
    Cleanup,
    /// Check free space on the store volume.
    SpaceCheck,
    /// Append the `POWER_ON` event.
    Record,
}

impl MaintenanceStage {
    /// Stages in execution order.
    pub const ALL: [Self; 6] = [
        Self::Open,
        Self::ConsistencyCheck,
        Self::Checkpoint,
        Self::Cleanup,
        Self::SpaceCheck,
        Self::Record,
    ];

    /// Returns the stage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::ConsistencyCheck => "consistency_check",
            Self::Checkpoint => "checkpoint",
            Self::Cleanup => "cleanup",
            Self::SpaceCheck => "space_check",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for MaintenanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Maintenance stage failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaintenanceError {
    /// A store operation failed during a stage.
    #[error("maintenance stage {stage} failed: {source}")]
    Store {
        /// Failing stage.
        stage: MaintenanceStage,
        /// Underlying store error.
        source: StoreError,
    },
    /// The structural integrity check reported problems.
    #[error("store integrity check failed: {0}")]
    Integrity(String),
    /// Free space is below the fatal floor.
    #[error("insufficient free space: {available_bytes} bytes available, {required_bytes} required")]
    InsufficientSpace {
        /// Free bytes reported for the volume.
        available_bytes: u64,
        /// Fatal floor in bytes.
        required_bytes: u64,
    },
    /// The bounded recovery attempt failed.
    #[error("store recovery failed: {0}")]
    Recovery(StoreError),
}

/// Outcome of a maintenance run, populated stage by stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaintenanceReport {
    /// Records present when the store was opened.
    pub records_at_startup: Option<u64>,
    /// Integrity problems reported by the last failed consistency check.
    pub integrity_problems: Vec<String>,
    /// Checkpoint result.
    pub checkpoint: Option<CheckpointReport>,
    /// Side files removed during cleanup.
    pub removed_files: Vec<PathBuf>,
    /// Free bytes reported during the space check.
    pub available_space_bytes: Option<u64>,
    /// True when free space was below the warning threshold.
    pub low_space: bool,
    /// True when the single recovery attempt was used.
    pub recovery_attempted: bool,
    /// Stage failures in the order they happened.
    pub failures: Vec<String>,
    /// Id of the `POWER_ON` event, once recorded.
    pub power_on_event: Option<EventId>,
}

/// Maintenance failed; the session must not start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("power-on maintenance aborted: {error}")]
pub struct MaintenanceAbort {
    /// Report populated up to the failure.
    pub report: MaintenanceReport,
    /// Failure that aborted maintenance.
    pub error: MaintenanceError,
}

// ============================================================================
// SECTION: Maintenance Runner
// ============================================================================

/// Runs the power-on routine against a store.
#[derive(Debug)]
pub struct PowerOnMaintenance<'a, S, C> {
    /// Store under maintenance.
    store: &'a S,
    /// Event timestamp source.
    clock: &'a C,
    /// Thresholds.
    config: MaintenanceConfig,
}

impl<'a, S: RecordStore, C: Clock> PowerOnMaintenance<'a, S, C> {
    /// Creates a maintenance runner.
    #[must_use]
    pub const fn new(store: &'a S, clock: &'a C, config: MaintenanceConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// Returns [`MaintenanceAbort`] when a stage fails twice or recovery
    /// fails.
    pub fn run(&self) -> Result<MaintenanceReport, MaintenanceAbort> {
        let mut report = MaintenanceReport::default();
        info!("power-on maintenance started");
        for stage in MaintenanceStage::ALL {
            if let Err(error) = self.run_with_recovery(stage, &mut report) {
                error!(stage = %stage, error = %error, "power-on maintenance aborted");
                return Err(MaintenanceAbort {
                    report,
                    error,
                });
            }
        }
        info!(
            records_at_startup = report.records_at_startup.unwrap_or_default(),
            removed_files = report.removed_files.len(),
            available_mb = report.available_space_bytes.unwrap_or_default() / BYTES_PER_MB,
            low_space = report.low_space,
            recovered = report.recovery_attempted,
            "power-on maintenance complete"
        );
        Ok(report)
    }

    /// Runs a stage, recovering once and retrying on failure.
    fn run_with_recovery(
        &self,
        stage: MaintenanceStage,
        report: &mut MaintenanceReport,
    ) -> Result<(), MaintenanceError> {
        let Err(first) = self.run_stage(stage, report) else {
            return Ok(());
        };
        self.record_failure(stage, &first, report);
        if report.recovery_attempted {
            return Err(first);
        }

        report.recovery_attempted = true;
        warn!(stage = %stage, error = %first, "attempting store recovery");
        if let Err(err) = self.store.recover() {
            let error = MaintenanceError::Recovery(err);
            self.record_failure(stage, &error, report);
            return Err(error);
        }
        info!(stage = %stage, "store recovery succeeded; retrying stage");

        match self.run_stage(stage, report) {
            Ok(()) => Ok(()),
            Err(second) => {
                self.record_failure(stage, &second, report);
                Err(second)
            }
        }
    }

    /// Executes a single stage.
    fn run_stage(
        &self,
        stage: MaintenanceStage,
        report: &mut MaintenanceReport,
    ) -> Result<(), MaintenanceError> {
        let store_err = |source: StoreError| MaintenanceError::Store {
            stage,
            source,
        };
        match stage {
            MaintenanceStage::Open => {
                self.store.ensure_schema().map_err(store_err)?;
                report.records_at_startup = Some(self.store.count_records().map_err(store_err)?);
            }
            MaintenanceStage::ConsistencyCheck => {
                let integrity = self.store.integrity_check().map_err(store_err)?;
                if !integrity.is_ok() {
                    let summary = integrity.problems.join("; ");
                    report.integrity_problems = integrity.problems;
                    return Err(MaintenanceError::Integrity(summary));
                }
                report.integrity_problems.clear();
            }
            MaintenanceStage::Checkpoint => {
                let checkpoint = self.store.checkpoint().map_err(store_err)?;
                if checkpoint.busy {
                    warn!(
                        log_frames = checkpoint.log_frames,
                        checkpointed_frames = checkpoint.checkpointed_frames,
                        "checkpoint incomplete; store busy"
                    );
                }
                report.checkpoint = Some(checkpoint);
            }
            MaintenanceStage::Cleanup => {
                let removed = self.store.remove_transient_files().map_err(store_err)?;
                for path in &removed {
                    info!(path = %path.display(), "removed transient file");
                }
                report.removed_files.extend(removed);
            }
            MaintenanceStage::SpaceCheck => self.check_space(report).map_err(|err| match err {
                SpaceFailure::Store(source) => store_err(source),
                SpaceFailure::Fatal(error) => error,
            })?,
            MaintenanceStage::Record => {
                let details = format!(
                    "power-on maintenance complete; records at startup: {}",
                    report.records_at_startup.unwrap_or_default()
                );
                let event = NewEvent::new(self.clock.now(), EventType::PowerOn, details);
                report.power_on_event = Some(self.store.append_event(&event).map_err(store_err)?);
            }
        }
        Ok(())
    }

    /// Compares free space against both thresholds.
    fn check_space(&self, report: &mut MaintenanceReport) -> Result<(), SpaceFailure> {
        let available = self.store.available_space_bytes().map_err(SpaceFailure::Store)?;
        report.available_space_bytes = Some(available);
        // A full volume is fatal whatever the configured floor.
        if available == 0 || available < self.config.fatal_free_space_bytes {
            return Err(SpaceFailure::Fatal(MaintenanceError::InsufficientSpace {
                available_bytes: available,
                required_bytes: self.config.fatal_free_space_bytes,
            }));
        }
        if available < self.config.min_free_space_bytes {
            report.low_space = true;
            warn!(
                available_mb = available / BYTES_PER_MB,
                threshold_mb = self.config.min_free_space_bytes / BYTES_PER_MB,
                "low disk space"
            );
            let details = format!(
                "{available} bytes free, warning threshold {} bytes",
                self.config.min_free_space_bytes
            );
            self.append_best_effort(EventType::LowSpace, details);
        }
        Ok(())
    }

    /// Logs a stage failure and appends a `MAINTENANCE_ERROR` event.
    fn record_failure(
        &self,
        stage: MaintenanceStage,
        error: &MaintenanceError,
        report: &mut MaintenanceReport,
    ) {
        error!(stage = %stage, error = %error, "maintenance stage failed");
        report.failures.push(format!("{stage}: {error}"));
        self.append_best_effort(EventType::MaintenanceError, format!("{stage}: {error}"));
    }

    /// Appends an event, logging instead of failing on error.
    fn append_best_effort(&self, event_type: EventType, details: String) {
        let event = NewEvent::new(self.clock.now(), event_type, details);
        if let Err(err) = self.store.append_event(&event) {
            warn!(event_type = %event_type, error = %err, "failed to append maintenance event");
        }
    }
}

/// Space-check failure split by cause.
enum SpaceFailure {
    /// The volume could not be queried.
    Store(StoreError),
    /// Free space is below the fatal floor.
    Fatal(MaintenanceError),
}
