// crates/sdstress-core/examples/minimal.rs
// ============================================================================
// Module: sdstress Minimal Example
// Description: Minimal maintenance, session, and verification cycle in memory.
// Purpose: Demonstrate the harness protocol without a storage engine.
// Dependencies: sdstress-core
// ============================================================================

//! ## Overview
//! Runs power-on maintenance and a three-iteration session against the
//! in-memory store, flips one stored value behind the harness's back, and
//! confirms the next verification pass reports it.

use std::num::NonZeroU64;
use std::time::Duration;

use sdstress_core::CancellationToken;
use sdstress_core::InMemoryRecordStore;
use sdstress_core::IntegrityVerifier;
use sdstress_core::MaintenanceConfig;
use sdstress_core::PayloadConfig;
use sdstress_core::PowerOnMaintenance;
use sdstress_core::RandomPayloadSource;
use sdstress_core::RecordId;
use sdstress_core::SessionConfig;
use sdstress_core::StressSession;
use sdstress_core::SystemClock;
use sdstress_core::VerifierConfig;

/// Example failure with a static message.
#[derive(Debug)]
struct ExampleError(&'static str);

impl std::fmt::Display for ExampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ExampleError {}

/// Runs the example cycle.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default()).run()?;

    let payloads = RandomPayloadSource::new(&PayloadConfig {
        length: 32,
        seed: Some(7),
        ..PayloadConfig::default()
    })?;
    let verify_interval = NonZeroU64::new(1).ok_or(ExampleError("interval must be nonzero"))?;
    let config = SessionConfig {
        pause: Duration::ZERO,
        progress_interval: Duration::from_secs(60),
        verify_interval,
        max_iterations: Some(3),
        verifier: VerifierConfig::default(),
    };
    let outcome = StressSession::new(&store, clock.clone(), payloads, config)
        .run(&CancellationToken::new());
    if outcome.summary.total_records != Some(3) {
        return Err(Box::new(ExampleError("session should persist three records")));
    }

    let target = RecordId::from_raw(2).ok_or(ExampleError("record id must be positive"))?;
    store.corrupt_value(target, "bit rot");
    let report = IntegrityVerifier::new(VerifierConfig::default()).verify_batch(&store, &clock, 0)?;
    if report.mismatched != vec![target] {
        return Err(Box::new(ExampleError("verification should flag the flipped record")));
    }
    Ok(())
}
