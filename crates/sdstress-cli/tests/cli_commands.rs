// crates/sdstress-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that drive the sdstress binary end to end.
// Purpose: Validate exit codes, persisted rows, and read-only inspection.
// Dependencies: sdstress-cli binary
// ============================================================================
//! ## Overview
//! Runs the binary against scratch stores: a bounded session, an interrupted
//! session, the read-only `verify` and `report` commands, tampering
//! detection, and usage errors.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn sdstress_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sdstress"))
}

/// Builds a binary invocation with a low space threshold so scratch volumes
/// never warn.
fn command_in(dir: &Path, args: &[&str]) -> Command {
    let db = dir.join("stress_test.db");
    let log = dir.join("sqlite_test.log");
    let config = dir.join("thresholds.toml");
    fs::write(&config, "[maintenance]\nmin_free_space_mb = 1\n").unwrap();
    let mut command = Command::new(sdstress_bin());
    command
        .current_dir(dir)
        .env("SDSTRESS_CONFIG", &config)
        .env_remove("SDSTRESS_LOG")
        .args(args)
        .args(["--db", db.to_str().unwrap(), "--log-file", log.to_str().unwrap()]);
    command
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    command_in(dir, args).output().expect("run sdstress")
}

/// Counts rows through a read-only connection; zero until the table exists.
fn peek_rows(path: &Path, table: &str) -> i64 {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .and_then(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| row.get(0))
        })
        .unwrap_or(0)
}

fn event_kinds(path: &Path) -> Vec<String> {
    let conn = Connection::open(path).unwrap();
    conn.prepare("SELECT event_type FROM system_events ORDER BY id")
        .unwrap()
        .query_map(params![], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| row.get(0)).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn bounded_session_writes_records_and_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--pause", "0", "--iterations", "5", "--seed", "1"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let db = dir.path().join("stress_test.db");
    assert_eq!(count_rows(&db, "test_data"), 5);
    assert_eq!(event_kinds(&db), vec!["POWER_ON", "SESSION_START", "SESSION_END"]);

    let log = fs::read_to_string(dir.path().join("sqlite_test.log")).unwrap();
    assert!(log.contains("session summary"));
    assert!(!log.contains("\u{1b}["));
}

#[cfg(unix)]
#[test]
fn interrupt_during_pause_shuts_down_cleanly() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("stress_test.db");
    let mut child = command_in(dir.path(), &["--pause", "10", "--seed", "3"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn sdstress");

    let deadline = Instant::now() + Duration::from_secs(20);
    while peek_rows(&db, "test_data") < 1 {
        assert!(Instant::now() < deadline, "no record written before the deadline");
        thread::sleep(Duration::from_millis(50));
    }
    thread::sleep(Duration::from_millis(200));
    let sent = Command::new("kill").args(["-INT", &child.id().to_string()]).status().unwrap();
    assert!(sent.success());

    let interrupted = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if interrupted.elapsed() > Duration::from_secs(5) {
            child.kill().unwrap();
            panic!("sdstress did not stop after the interrupt");
        }
        thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(status.code(), Some(0));

    assert_eq!(count_rows(&db, "test_data"), 1);
    assert_eq!(event_kinds(&db), vec!["POWER_ON", "SESSION_START", "SESSION_END"]);
    let log = fs::read_to_string(dir.path().join("sqlite_test.log")).unwrap();
    assert!(log.contains("interrupt received"));
    assert!(log.contains("session summary"));
    assert!(log.contains("total records: 1"));
}

#[test]
fn unopenable_store_logs_summary_and_fails() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("stress_test.db")).unwrap();
    let output = run_in(dir.path(), &["--pause", "0", "--iterations", "1"]);
    assert_eq!(output.status.code(), Some(1));
    let log = fs::read_to_string(dir.path().join("sqlite_test.log")).unwrap();
    assert!(log.contains("power-on maintenance aborted"));
    assert!(log.contains("total records: unknown"));
}

#[test]
fn verify_reports_clean_store_without_writing_events() {
    let dir = TempDir::new().unwrap();
    let setup = run_in(dir.path(), &["--pause", "0", "--iterations", "3"]);
    assert!(setup.status.success());
    let db = dir.path().join("stress_test.db");
    let events_before = count_rows(&db, "system_events");

    let output = run_in(dir.path(), &["verify"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("checked=3 corrupt=0"), "stdout: {stdout}");
    assert_eq!(count_rows(&db, "system_events"), events_before);
}

#[test]
fn verify_flags_tampered_record() {
    let dir = TempDir::new().unwrap();
    assert!(run_in(dir.path(), &["--pause", "0", "--iterations", "4"]).status.success());
    let db = dir.path().join("stress_test.db");
    let conn = Connection::open(&db).unwrap();
    conn.execute("UPDATE test_data SET value = 'bitrot' WHERE id = 2", params![]).unwrap();
    drop(conn);

    let output = run_in(dir.path(), &["verify"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("corrupt record id=2"), "stdout: {stdout}");
}

#[test]
fn report_prints_summary_for_existing_store() {
    let dir = TempDir::new().unwrap();
    assert!(run_in(dir.path(), &["--pause", "0", "--iterations", "2"]).status.success());
    let output = run_in(dir.path(), &["report"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("total_records=2"), "stdout: {stdout}");
}

#[test]
fn report_on_missing_store_fails_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["report"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("stress_test.db").exists());
}

#[test]
fn maintain_runs_power_on_maintenance_only() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["maintain"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let db = dir.path().join("stress_test.db");
    assert_eq!(count_rows(&db, "test_data"), 0);
    assert_eq!(count_rows(&db, "system_events"), 1);
}

#[test]
fn invalid_flag_value_exits_with_usage_code() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--pause", "abc"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("stress_test.db").exists());
}

#[test]
fn invalid_config_file_exits_with_usage_code() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[writer]\npayload_length = 0\n").unwrap();
    let output = run_in(dir.path(), &["--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("writer.payload_length"), "stderr: {stderr}");
}
