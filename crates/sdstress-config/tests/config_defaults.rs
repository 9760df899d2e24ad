//! Config defaults and validation tests for sdstress-config.
// crates/sdstress-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Validation Tests
// Description: Validate default behavior and range checks.
// Purpose: Ensure defaults are valid and out-of-range values fail closed.
// =============================================================================

#![allow(
    clippy::use_debug,
    clippy::panic_in_result_fn,
    reason = "Test-only diagnostics are permitted."
)]

use std::path::PathBuf;

use sdstress_config::ConfigError;
use sdstress_config::StressConfig;
use sdstress_core::VerifyScope;
use sdstress_store_sqlite::SqliteStoreMode;
use sdstress_store_sqlite::SqliteSyncMode;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn default_config_validates() -> TestResult {
    StressConfig::default().validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn defaults_match_harness_conventions() -> TestResult {
    let config = StressConfig::default();
    if config.store.path != PathBuf::from("stress_test.db")
        || config.store.journal_mode != SqliteStoreMode::Wal
        || config.store.sync_mode != SqliteSyncMode::Full
    {
        return Err(format!("unexpected store defaults: {:?}", config.store));
    }
    if config.logging.file != PathBuf::from("sqlite_test.log") || config.logging.filter != "info" {
        return Err(format!("unexpected logging defaults: {:?}", config.logging));
    }
    if config.writer.payload_length != 1_000 || config.writer.alphabet.len() != 26 {
        return Err(format!("unexpected writer defaults: {:?}", config.writer));
    }
    let session = config.session_config().map_err(|err| err.to_string())?;
    if session.pause.as_secs() != 10
        || session.progress_interval.as_secs() != 10
        || session.max_iterations.is_some()
        || session.verifier.scope != VerifyScope::Full
    {
        return Err(format!("unexpected session defaults: {session:?}"));
    }
    Ok(())
}

#[test]
fn empty_toml_is_the_default_config() -> TestResult {
    let config = StressConfig::from_toml_str("").map_err(|err| err.to_string())?;
    if config != StressConfig::default() {
        return Err("empty config should equal defaults".to_string());
    }
    Ok(())
}

#[test]
fn zero_payload_length_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.writer.payload_length = 0;
    assert_invalid(config.validate(), "writer.payload_length")
}

#[test]
fn oversized_payload_length_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.writer.payload_length = 1024 * 1024 + 1;
    assert_invalid(config.validate(), "writer.payload_length")
}

#[test]
fn non_ascii_alphabet_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.writer.alphabet = "aé".to_string();
    assert_invalid(config.validate(), "writer.alphabet must be ascii")
}

#[test]
fn empty_alphabet_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.writer.alphabet = String::new();
    assert_invalid(config.validate(), "writer.alphabet must be non-empty")
}

#[test]
fn zero_verify_interval_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.session.verify_interval = 0;
    assert_invalid(config.validate(), "session.verify_interval")?;
    match config.session_config() {
        Err(ConfigError::Invalid(_)) => Ok(()),
        other => Err(format!("expected invalid session config, got {other:?}")),
    }
}

#[test]
fn zero_iteration_limit_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.session.max_iterations = Some(0);
    assert_invalid(config.validate(), "session.max_iterations")
}

#[test]
fn zero_page_size_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.verifier.page_size = 0;
    assert_invalid(config.validate(), "verifier.page_size")
}

#[test]
fn zero_busy_timeout_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.store.busy_timeout_ms = 0;
    assert_invalid(config.validate(), "store.busy_timeout_ms")
}

#[test]
fn empty_store_path_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.store.path = PathBuf::new();
    assert_invalid(config.validate(), "store.path must be non-empty")
}

#[test]
fn warning_threshold_below_fatal_threshold_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.maintenance.min_free_space_mb = 1;
    config.maintenance.fatal_free_space_bytes = 2 * 1024 * 1024;
    assert_invalid(config.validate(), "maintenance.min_free_space_mb")
}

#[test]
fn blank_log_filter_is_rejected() -> TestResult {
    let mut config = StressConfig::default();
    config.logging.filter = "  ".to_string();
    assert_invalid(config.validate(), "logging.filter must be non-empty")
}
