// crates/sdstress-core/src/runtime/mod.rs
// ============================================================================
// Module: sdstress Runtime
// Description: Write/verify session loop, power-on maintenance, and helpers.
// Purpose: Execute the durability protocol against a record store.
// Dependencies: crate::{core, interfaces}, rand, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the harness protocol: power-on maintenance runs
//! once, then a single-threaded session loop writes checksummed records,
//! verifies them periodically, and reports a summary on every exit path.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cancel;
pub mod clock;
pub mod generator;
pub mod maintenance;
pub mod payload;
pub mod report;
pub mod session;
pub mod store;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancellationToken;
pub use clock::SystemClock;
pub use generator::WriteGenerator;
pub use generator::submit_record;
pub use maintenance::MaintenanceAbort;
pub use maintenance::MaintenanceConfig;
pub use maintenance::MaintenanceError;
pub use maintenance::MaintenanceReport;
pub use maintenance::MaintenanceStage;
pub use maintenance::PowerOnMaintenance;
pub use payload::PayloadConfig;
pub use payload::PayloadError;
pub use payload::RandomPayloadSource;
pub use report::SessionCounters;
pub use report::log_summary;
pub use report::summarize;
pub use session::SessionConfig;
pub use session::SessionOutcome;
pub use session::StressSession;
pub use session::Termination;
pub use store::InMemoryRecordStore;
pub use verifier::IntegrityVerifier;
pub use verifier::VerificationReport;
pub use verifier::VerifierConfig;
pub use verifier::VerifyScope;
