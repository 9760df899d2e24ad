// crates/sdstress-core/src/lib.rs
// ============================================================================
// Module: sdstress Core Library
// Description: Public API surface for the sdstress durability harness core.
// Purpose: Expose record types, store interfaces, and the write/verify runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! sdstress core drives an embedded record store as a black box: it writes
//! checksummed records, re-reads them to detect silent corruption, and runs a
//! power-on maintenance routine before each session. Storage, time, and payload
//! generation are reached through explicit interfaces so the protocol can be
//! exercised against `SQLite` in production and an in-memory store in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CheckpointReport;
pub use interfaces::Clock;
pub use interfaces::IntegrityReport;
pub use interfaces::PayloadSource;
pub use interfaces::RecordStore;
pub use interfaces::StoreError;
pub use runtime::CancellationToken;
pub use runtime::InMemoryRecordStore;
pub use runtime::IntegrityVerifier;
pub use runtime::MaintenanceAbort;
pub use runtime::MaintenanceConfig;
pub use runtime::MaintenanceError;
pub use runtime::MaintenanceReport;
pub use runtime::MaintenanceStage;
pub use runtime::PayloadConfig;
pub use runtime::PowerOnMaintenance;
pub use runtime::RandomPayloadSource;
pub use runtime::SessionConfig;
pub use runtime::SessionOutcome;
pub use runtime::StressSession;
pub use runtime::SystemClock;
pub use runtime::Termination;
pub use runtime::VerificationReport;
pub use runtime::VerifierConfig;
pub use runtime::VerifyScope;
pub use runtime::WriteGenerator;
