// crates/sdstress-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and config overrides.
// Purpose: Ensure flags map onto configuration and bad input fails as usage.
// Dependencies: sdstress-cli main helpers
// ============================================================================

//! ## Overview
//! Validates flag parsing, override precedence, exit code mapping, and log
//! filter resolution.

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

use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;
use sdstress_config::ConfigError;
use sdstress_config::StressConfig;

use super::Cli;
use super::CliError;
use super::CliErrorKind;
use super::Commands;
use super::apply_overrides;
use crate::logging::resolve_filter;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn bare_invocation_runs_a_session_with_no_overrides() {
    let cli = Cli::try_parse_from(["sdstress"]).unwrap();
    assert_eq!(cli.command, None);
    assert_eq!(cli.run.pause, None);
    assert_eq!(cli.common.db, None);
}

#[test]
fn run_flags_are_parsed() {
    let cli = Cli::try_parse_from([
        "sdstress",
        "--pause",
        "2",
        "--progress-interval",
        "5",
        "--db",
        "/mnt/sd/test.db",
        "--log-file",
        "/tmp/harness.log",
        "--iterations",
        "50",
        "--verify-interval",
        "7",
        "--seed",
        "99",
    ])
    .unwrap();
    assert_eq!(cli.run.pause, Some(2));
    assert_eq!(cli.run.progress_interval, Some(5));
    assert_eq!(cli.run.iterations, Some(50));
    assert_eq!(cli.run.verify_interval, Some(7));
    assert_eq!(cli.run.seed, Some(99));
    assert_eq!(cli.common.db, Some(PathBuf::from("/mnt/sd/test.db")));
    assert_eq!(cli.common.log_file, Some(PathBuf::from("/tmp/harness.log")));
}

#[test]
fn non_numeric_pause_is_a_usage_error() {
    let err = Cli::try_parse_from(["sdstress", "--pause", "soon"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn negative_progress_interval_is_a_usage_error() {
    let err = Cli::try_parse_from(["sdstress", "--progress-interval", "-3"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn subcommands_accept_global_store_flags() {
    let cli = Cli::try_parse_from(["sdstress", "verify", "--db", "other.db"]).unwrap();
    assert_eq!(cli.command, Some(Commands::Verify));
    assert_eq!(cli.common.db, Some(PathBuf::from("other.db")));

    let cli = Cli::try_parse_from(["sdstress", "report"]).unwrap();
    assert_eq!(cli.command, Some(Commands::Report));
    let cli = Cli::try_parse_from(["sdstress", "maintain"]).unwrap();
    assert_eq!(cli.command, Some(Commands::Maintain));
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

#[test]
fn flags_override_file_values() {
    let mut config = StressConfig::from_toml_str(
        "[session]\npause_secs = 30\nverify_interval = 10\n[writer]\nseed = 1\n",
    )
    .unwrap();
    let cli = Cli::try_parse_from(["sdstress", "--pause", "0", "--seed", "4", "--db", "x.db"])
        .unwrap();
    apply_overrides(&mut config, &cli.common, &cli.run);
    assert_eq!(config.session.pause_secs, 0);
    assert_eq!(config.session.verify_interval, 10);
    assert_eq!(config.writer.seed, Some(4));
    assert_eq!(config.store.path, PathBuf::from("x.db"));
}

#[test]
fn zero_iteration_override_fails_validation() {
    let mut config = StressConfig::default();
    let cli = Cli::try_parse_from(["sdstress", "--iterations", "0"]).unwrap();
    apply_overrides(&mut config, &cli.common, &cli.run);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

// ============================================================================
// SECTION: Errors and Logging
// ============================================================================

#[test]
fn config_errors_are_usage_errors() {
    let error = CliError::from(ConfigError::Invalid("bad".to_string()));
    assert_eq!(error.kind, CliErrorKind::Usage);
    assert_eq!(CliError::runtime("io".to_string()).kind, CliErrorKind::Runtime);
}

#[test]
fn log_filter_prefers_environment_value() {
    let filter = resolve_filter(Some("debug"), "info").unwrap();
    assert_eq!(filter.to_string(), "debug");
    let filter = resolve_filter(Some("  "), "warn").unwrap();
    assert_eq!(filter.to_string(), "warn");
    let filter = resolve_filter(None, "info").unwrap();
    assert_eq!(filter.to_string(), "info");
}
