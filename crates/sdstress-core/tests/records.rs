// crates/sdstress-core/tests/records.rs
// ============================================================================
// Module: Record Model Tests
// Description: Timestamps, identifiers, event labels, and summary rendering.
// ============================================================================
//! ## Overview
//! Covers the persisted text forms the store relies on.

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

use proptest::prelude::*;
use sdstress_core::EventId;
use sdstress_core::EventType;
use sdstress_core::RecordId;
use sdstress_core::SessionSummary;
use sdstress_core::Timestamp;

#[test]
fn timestamp_persisted_form_is_fixed_width_utc() {
    assert_eq!(Timestamp::from_unix_millis(0).to_persisted(), "1970-01-01T00:00:00.000Z");
    assert_eq!(
        Timestamp::from_unix_millis(1_700_000_000_123).to_persisted(),
        "2023-11-14T22:13:20.123Z"
    );
}

#[test]
fn timestamp_parse_rejects_foreign_formats() {
    assert_eq!(Timestamp::parse_persisted("2023-11-14 22:13:20"), None);
    assert_eq!(Timestamp::parse_persisted("garbage"), None);
}

#[test]
fn identifiers_start_at_one() {
    assert!(RecordId::from_raw(0).is_none());
    assert!(RecordId::from_raw(-5).is_none());
    assert_eq!(RecordId::from_raw(1).map(RecordId::get), Some(1));
    assert_eq!(EventId::from_raw(42).map(|id| id.to_string()), Some("42".to_string()));
}

#[test]
fn event_type_labels_round_trip() {
    let all = [
        EventType::SessionStart,
        EventType::PowerOn,
        EventType::MaintenanceError,
        EventType::CorruptionDetected,
        EventType::SessionEnd,
        EventType::LowSpace,
        EventType::StorageError,
    ];
    for event_type in all {
        assert_eq!(event_type.as_str().parse::<EventType>(), Ok(event_type));
    }
    assert_eq!(EventType::PowerOn.to_string(), "POWER_ON");
    assert!("REBOOT".parse::<EventType>().is_err());
}

#[test]
fn summary_renders_unknown_store_fields() {
    let summary = SessionSummary {
        corrupt_record_count: 2,
        records_written: 7,
        ..SessionSummary::default()
    };
    let rendered = summary.to_string();
    assert!(rendered.contains("total_records=unknown"));
    assert!(rendered.contains("first_record=none"));
    assert!(rendered.contains("corrupt_record_count=2"));
    assert!(rendered.contains("records_written=7"));
}

#[test]
fn summary_reports_size_in_mebibytes() {
    let summary = SessionSummary {
        database_size_bytes: Some(3 * 1024 * 1024),
        ..SessionSummary::default()
    };
    assert_eq!(summary.database_size_mb(), Some(3.0));
    assert!(summary.to_string().contains("size_mb=3.00"));
}

proptest! {
    #[test]
    fn persisted_timestamps_parse_back(millis in 0i64 .. 4_102_444_800_000) {
        let timestamp = Timestamp::from_unix_millis(millis);
        prop_assert_eq!(Timestamp::parse_persisted(&timestamp.to_persisted()), Some(timestamp));
    }

    #[test]
    fn persisted_order_matches_numeric_order(a in 0i64 .. 4_102_444_800_000, b in 0i64 .. 4_102_444_800_000) {
        let left = Timestamp::from_unix_millis(a).to_persisted();
        let right = Timestamp::from_unix_millis(b).to_persisted();
        prop_assert_eq!(a.cmp(&b), left.cmp(&right));
    }
}
