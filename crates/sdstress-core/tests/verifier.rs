// crates/sdstress-core/tests/verifier.rs
// ============================================================================
// Module: Integrity Verifier Tests
// Description: Checksum verification passes over the in-memory store.
// ============================================================================
//! ## Overview
//! Covers clean passes, external mutation, unreadable values, paging, the
//! cumulative distinct-id tally, and incremental scope.

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

use sdstress_core::EventType;
use sdstress_core::InMemoryRecordStore;
use sdstress_core::IntegrityVerifier;
use sdstress_core::PayloadConfig;
use sdstress_core::RandomPayloadSource;
use sdstress_core::RecordId;
use sdstress_core::RecordStore;
use sdstress_core::SystemClock;
use sdstress_core::VerifierConfig;
use sdstress_core::VerifyScope;
use sdstress_core::WriteGenerator;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn populated_store(count: usize) -> (InMemoryRecordStore, SystemClock) {
    let store = InMemoryRecordStore::new();
    store.ensure_schema().unwrap();
    let clock = SystemClock::new();
    let config = PayloadConfig {
        length: 32,
        seed: Some(9),
        ..PayloadConfig::default()
    };
    let mut generator = WriteGenerator::new(RandomPayloadSource::new(&config).unwrap());
    for _ in 0 .. count {
        generator.generate_record(&store, &clock).unwrap();
    }
    (store, clock)
}

fn id(raw: i64) -> RecordId {
    RecordId::from_raw(raw).unwrap()
}

fn corruption_events(store: &InMemoryRecordStore) -> usize {
    store
        .list_events()
        .unwrap()
        .iter()
        .filter(|event| event.is(EventType::CorruptionDetected))
        .count()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn clean_store_verifies_every_record() {
    let (store, clock) = populated_store(25);
    let mut verifier = IntegrityVerifier::new(VerifierConfig::default());
    let report = verifier.verify_batch(&store, &clock, 25).unwrap();
    assert_eq!(report.checked, 25);
    assert!(report.mismatched.is_empty());
    assert_eq!(report.corrupt_tally, 0);
    assert_eq!(verifier.passes(), 1);
    assert_eq!(corruption_events(&store), 0);
}

#[test]
fn empty_store_verifies_nothing() {
    let (store, clock) = populated_store(0);
    let mut verifier = IntegrityVerifier::new(VerifierConfig::default());
    let report = verifier.verify_batch(&store, &clock, 0).unwrap();
    assert_eq!(report.checked, 0);
    assert!(report.mismatched.is_empty());
}

#[test]
fn external_mutation_is_reported_every_pass_but_counted_once() {
    let (store, clock) = populated_store(10);
    store.corrupt_value(id(4), "tampered");
    let mut verifier = IntegrityVerifier::new(VerifierConfig::default());

    let first = verifier.verify_batch(&store, &clock, 10).unwrap();
    assert_eq!(first.checked, 10);
    assert_eq!(first.mismatched, vec![id(4)]);
    assert_eq!(first.newly_corrupt, vec![id(4)]);
    assert_eq!(first.corrupt_tally, 1);

    let second = verifier.verify_batch(&store, &clock, 20).unwrap();
    assert_eq!(second.mismatched, vec![id(4)]);
    assert!(second.newly_corrupt.is_empty());
    assert_eq!(second.corrupt_tally, 1);
    assert_eq!(corruption_events(&store), 1);
}

#[test]
fn tally_counts_each_distinct_corrupt_record() {
    let (store, clock) = populated_store(10);
    let mut verifier = IntegrityVerifier::new(VerifierConfig::default());
    store.corrupt_value(id(2), "x");
    verifier.verify_batch(&store, &clock, 1).unwrap();
    store.corrupt_value(id(7), "y");
    let report = verifier.verify_batch(&store, &clock, 2).unwrap();
    assert_eq!(report.mismatched, vec![id(2), id(7)]);
    assert_eq!(report.newly_corrupt, vec![id(7)]);
    assert_eq!(verifier.corrupt_tally(), 2);
    assert_eq!(verifier.corrupt_ids().iter().copied().collect::<Vec<_>>(), vec![id(2), id(7)]);
    assert_eq!(corruption_events(&store), 2);
}

#[test]
fn unreadable_value_and_missing_checksum_count_as_corrupt() {
    let (store, clock) = populated_store(5);
    store.make_value_unreadable(id(1));
    store.drop_checksum(id(5));
    let mut verifier = IntegrityVerifier::new(VerifierConfig::default());
    let report = verifier.verify_batch(&store, &clock, 5).unwrap();
    assert_eq!(report.checked, 5);
    assert_eq!(report.mismatched, vec![id(1), id(5)]);
    assert_eq!(report.corrupt_tally, 2);
}

#[test]
fn paging_covers_all_rows_in_id_order() {
    let (store, clock) = populated_store(10);
    store.corrupt_value(id(3), "a");
    store.corrupt_value(id(9), "b");
    let mut verifier = IntegrityVerifier::new(VerifierConfig {
        page_size: 3,
        ..VerifierConfig::default()
    });
    let report = verifier.verify_batch(&store, &clock, 10).unwrap();
    assert_eq!(report.checked, 10);
    assert_eq!(report.mismatched, vec![id(3), id(9)]);
    assert_eq!(verifier.high_water(), Some(id(10)));
}

#[test]
fn incremental_scope_checks_only_new_rows() {
    let (store, clock) = populated_store(6);
    let mut verifier = IntegrityVerifier::new(VerifierConfig {
        scope: VerifyScope::Incremental,
        ..VerifierConfig::default()
    });
    assert_eq!(verifier.verify_batch(&store, &clock, 6).unwrap().checked, 6);

    let config = PayloadConfig {
        length: 16,
        seed: Some(1),
        ..PayloadConfig::default()
    };
    let mut generator = WriteGenerator::new(RandomPayloadSource::new(&config).unwrap());
    for _ in 0 .. 4 {
        generator.generate_record(&store, &clock).unwrap();
    }
    let report = verifier.verify_batch(&store, &clock, 10).unwrap();
    assert_eq!(report.checked, 4);
    assert_eq!(verifier.high_water(), Some(id(10)));
    assert_eq!(verifier.verify_batch(&store, &clock, 11).unwrap().checked, 0);
}

#[test]
fn read_only_verifier_appends_no_events() {
    let (store, clock) = populated_store(3);
    store.corrupt_value(id(2), "z");
    let mut verifier = IntegrityVerifier::new(VerifierConfig {
        record_events: false,
        ..VerifierConfig::default()
    });
    let report = verifier.verify_batch(&store, &clock, 0).unwrap();
    assert_eq!(report.corrupt_tally, 1);
    assert_eq!(corruption_events(&store), 0);
}

#[test]
fn failed_event_append_does_not_stop_verification() {
    let (store, clock) = populated_store(4);
    store.corrupt_value(id(1), "q");
    store.corrupt_value(id(2), "r");
    store.fail_next_event_appends(1);
    let mut verifier = IntegrityVerifier::new(VerifierConfig::default());
    let report = verifier.verify_batch(&store, &clock, 4).unwrap();
    assert_eq!(report.checked, 4);
    assert_eq!(report.corrupt_tally, 2);
    assert_eq!(corruption_events(&store), 1);
}
