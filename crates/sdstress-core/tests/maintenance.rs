// crates/sdstress-core/tests/maintenance.rs
// ============================================================================
// Module: Power-On Maintenance Tests
// Description: Stage sequencing, bounded recovery, and space thresholds.
// ============================================================================
//! ## Overview
//! Drives [`PowerOnMaintenance`] against the in-memory store with injected
//! faults.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::path::PathBuf;

use sdstress_core::EventType;
use sdstress_core::InMemoryRecordStore;
use sdstress_core::MaintenanceConfig;
use sdstress_core::MaintenanceError;
use sdstress_core::PayloadConfig;
use sdstress_core::PowerOnMaintenance;
use sdstress_core::RandomPayloadSource;
use sdstress_core::RecordStore;
use sdstress_core::SystemClock;
use sdstress_core::WriteGenerator;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn count_events(store: &InMemoryRecordStore, event_type: EventType) -> usize {
    store.list_events().unwrap().iter().filter(|event| event.is(event_type)).count()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn fresh_store_reaches_ready() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    let report = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default()).run().unwrap();
    assert!(store.schema_ready());
    assert_eq!(report.records_at_startup, Some(0));
    assert!(report.power_on_event.is_some());
    assert!(!report.recovery_attempted);
    assert!(report.failures.is_empty());
    assert_eq!(store.checkpoint_count(), 1);
    assert_eq!(count_events(&store, EventType::PowerOn), 1);
}

#[test]
fn maintenance_is_idempotent() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    let maintenance = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default());
    maintenance.run().unwrap();
    let second = maintenance.run().unwrap();
    assert!(second.failures.is_empty());
    assert_eq!(count_events(&store, EventType::PowerOn), 2);
    assert_eq!(count_events(&store, EventType::MaintenanceError), 0);
    assert_eq!(store.count_records().unwrap(), 0);
}

#[test]
fn power_on_event_reports_startup_record_count() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.ensure_schema().unwrap();
    let mut generator =
        WriteGenerator::new(RandomPayloadSource::new(&PayloadConfig::default()).unwrap());
    for _ in 0 .. 3 {
        generator.generate_record(&store, &clock).unwrap();
    }
    let report = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default()).run().unwrap();
    assert_eq!(report.records_at_startup, Some(3));
    let events = store.list_events().unwrap();
    let power_on = events.iter().find(|event| event.is(EventType::PowerOn)).unwrap();
    assert!(power_on.details.contains("records at startup: 3"));
}

#[test]
fn integrity_failure_recovers_once_and_retries() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.fail_next_integrity_checks(1);
    let report = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default()).run().unwrap();
    assert!(report.recovery_attempted);
    assert_eq!(report.failures.len(), 1);
    assert!(report.integrity_problems.is_empty());
    assert_eq!(store.recovery_attempts(), 1);
    assert_eq!(count_events(&store, EventType::MaintenanceError), 1);
    assert_eq!(count_events(&store, EventType::PowerOn), 1);
}

#[test]
fn persistent_integrity_failure_aborts() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.fail_next_integrity_checks(2);
    let abort = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default())
        .run()
        .unwrap_err();
    assert!(matches!(abort.error, MaintenanceError::Integrity(_)));
    assert_eq!(abort.report.integrity_problems, vec!["injected integrity failure".to_string()]);
    assert_eq!(store.recovery_attempts(), 1);
    assert_eq!(count_events(&store, EventType::MaintenanceError), 2);
    assert_eq!(count_events(&store, EventType::PowerOn), 0);
}

#[test]
fn failed_recovery_aborts_without_retry() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.fail_next_integrity_checks(1);
    store.set_recover_fails(true);
    let abort = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default())
        .run()
        .unwrap_err();
    assert!(matches!(abort.error, MaintenanceError::Recovery(_)));
    assert_eq!(store.recovery_attempts(), 1);
    assert_eq!(count_events(&store, EventType::PowerOn), 0);
}

#[test]
fn low_space_warns_and_continues() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.set_available_space(50 * 1024 * 1024);
    let report = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default()).run().unwrap();
    assert!(report.low_space);
    assert_eq!(report.available_space_bytes, Some(50 * 1024 * 1024));
    assert_eq!(count_events(&store, EventType::LowSpace), 1);
    assert_eq!(count_events(&store, EventType::PowerOn), 1);
}

#[test]
fn exhausted_space_is_fatal() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.set_available_space(0);
    let abort = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default())
        .run()
        .unwrap_err();
    assert!(matches!(abort.error, MaintenanceError::InsufficientSpace { available_bytes: 0, .. }));
    assert!(abort.report.recovery_attempted);
    assert_eq!(count_events(&store, EventType::PowerOn), 0);
}

#[test]
fn zero_free_space_is_fatal_even_without_a_floor() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.set_available_space(0);
    let config = MaintenanceConfig {
        min_free_space_bytes: 0,
        fatal_free_space_bytes: 0,
    };
    let abort = PowerOnMaintenance::new(&store, &clock, config).run().unwrap_err();
    assert!(matches!(abort.error, MaintenanceError::InsufficientSpace { available_bytes: 0, .. }));
    assert_eq!(count_events(&store, EventType::LowSpace), 0);
    assert_eq!(count_events(&store, EventType::PowerOn), 0);
}

#[test]
fn cleanup_reports_removed_side_files() {
    let store = InMemoryRecordStore::new();
    let clock = SystemClock::new();
    store.add_transient_file("stress_test.db-shm");
    let report = PowerOnMaintenance::new(&store, &clock, MaintenanceConfig::default()).run().unwrap();
    assert_eq!(report.removed_files, vec![PathBuf::from("stress_test.db-shm")]);
}

#[test]
fn thresholds_scale_from_megabytes() {
    let config = MaintenanceConfig::with_min_free_space_mb(5);
    assert_eq!(config.min_free_space_bytes, 5 * 1024 * 1024);
    assert_eq!(MaintenanceConfig::default().min_free_space_bytes, 100 * 1024 * 1024);
}
