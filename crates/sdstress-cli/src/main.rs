// crates/sdstress-cli/src/main.rs
// ============================================================================
// Module: sdstress CLI Entry Point
// Description: Command dispatcher for the storage durability harness.
// Purpose: Run stress sessions, standalone maintenance, and offline inspection.
// Dependencies: clap, sdstress-config, sdstress-core, sdstress-store-sqlite,
//               thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! Without a subcommand the binary runs power-on maintenance followed by a
//! stress session until interrupted. `maintain` runs maintenance only;
//! `verify` and `report` open an existing store read-only and write nothing.
//! The session loop runs on a blocking thread while a signal task translates
//! Ctrl+C into cancellation, so shutdown always takes the finalization path.
//!
//! Exit codes: 0 clean shutdown (interrupt or iteration limit), 1 maintenance
//! abort, storage failure, or corruption found by `verify`, 2 configuration or
//! usage errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod logging;
#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use sdstress_config::ConfigError;
use sdstress_config::StressConfig;
use sdstress_core::CancellationToken;
use sdstress_core::IntegrityVerifier;
use sdstress_core::PowerOnMaintenance;
use sdstress_core::RandomPayloadSource;
use sdstress_core::RecordStore;
use sdstress_core::SessionSummary;
use sdstress_core::StressSession;
use sdstress_core::SystemClock;
use sdstress_core::VerifierConfig;
use sdstress_core::VerifyScope;
use sdstress_core::runtime::SessionCounters;
use sdstress_core::runtime::log_summary;
use sdstress_core::runtime::summarize;
use sdstress_store_sqlite::SqliteRecordStore;
use thiserror::Error;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::logging::init_logging;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for configuration and usage errors.
const EXIT_USAGE: u8 = 2;
/// Exit code for runtime failures.
const EXIT_FAILURE: u8 = 1;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "sdstress",
    version,
    about = "Durability stress harness for SQLite stores on removable media"
)]
struct Cli {
    /// Options shared by every command.
    #[command(flatten)]
    common: CommonArgs,
    /// Options for the default stress session.
    #[command(flatten)]
    run: RunArgs,
    /// Optional subcommand; runs a stress session when absent.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command.
#[derive(Args, Debug, Default, Clone)]
struct CommonArgs {
    /// Database file (default `stress_test.db`).
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,
    /// Log file, opened in append mode (default `sqlite_test.log`).
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
    /// Configuration file (overrides `SDSTRESS_CONFIG` and `sdstress.toml`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
}

/// Options for the stress session.
#[derive(Args, Debug, Default, Clone)]
struct RunArgs {
    /// Seconds to pause between write iterations (default 10).
    #[arg(long, value_name = "SECONDS")]
    pause: Option<u64>,
    /// Minimum seconds between progress log lines (default 10).
    #[arg(long, value_name = "SECONDS")]
    progress_interval: Option<u64>,
    /// Stop cleanly after this many iterations.
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,
    /// Iterations between verification passes (default 100).
    #[arg(long, value_name = "N")]
    verify_interval: Option<u64>,
    /// Seed for reproducible payloads.
    #[arg(long, value_name = "U64")]
    seed: Option<u64>,
}

/// Supported subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Verify every stored record against its checksum (read-only).
    Verify,
    /// Print a summary of an existing store (read-only).
    Report,
    /// Run power-on maintenance and exit.
    Maintain,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error categories mapped to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliErrorKind {
    /// Configuration or usage problem detected before the store is touched.
    Usage,
    /// Runtime failure after startup.
    Runtime,
}

/// CLI error wrapper carrying the exit category.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Error category.
    kind: CliErrorKind,
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a usage error.
    const fn usage(message: String) -> Self {
        Self {
            kind: CliErrorKind::Usage,
            message,
        }
    }

    /// Constructs a runtime error.
    const fn runtime(message: String) -> Self {
        Self {
            kind: CliErrorKind::Runtime,
            message,
        }
    }

    /// Returns the process exit code for this error.
    fn exit_code(&self) -> ExitCode {
        match self.kind {
            CliErrorKind::Usage => ExitCode::from(EXIT_USAGE),
            CliErrorKind::Runtime => ExitCode::from(EXIT_FAILURE),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::usage(error.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Executes the CLI command dispatcher.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = resolve_config(&cli)?;
    init_logging(&config.logging.file, &config.logging.filter)
        .map_err(|err| CliError::usage(err.to_string()))?;
    if let Some(source) = &config.source {
        info!(config = %source.display(), "configuration loaded");
    }

    match cli.command {
        None => command_run(config).await,
        Some(Commands::Maintain) => command_maintain(&config),
        Some(Commands::Verify) => command_verify(&config),
        Some(Commands::Report) => command_report(&config),
    }
}

/// Loads configuration and applies command-line overrides.
fn resolve_config(cli: &Cli) -> CliResult<StressConfig> {
    let mut config = StressConfig::load(cli.common.config.as_deref())?;
    apply_overrides(&mut config, &cli.common, &cli.run);
    config.validate()?;
    Ok(config)
}

/// Writes command-line values over the loaded configuration.
fn apply_overrides(config: &mut StressConfig, common: &CommonArgs, run: &RunArgs) {
    if let Some(db) = &common.db {
        config.store.path.clone_from(db);
    }
    if let Some(log_file) = &common.log_file {
        config.logging.file.clone_from(log_file);
    }
    if let Some(pause) = run.pause {
        config.session.pause_secs = pause;
    }
    if let Some(progress_interval) = run.progress_interval {
        config.session.progress_interval_secs = progress_interval;
    }
    if let Some(iterations) = run.iterations {
        config.session.max_iterations = Some(iterations);
    }
    if let Some(verify_interval) = run.verify_interval {
        config.session.verify_interval = verify_interval;
    }
    if let Some(seed) = run.seed {
        config.writer.seed = Some(seed);
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Runs maintenance and the stress session until interrupted.
async fn command_run(config: StressConfig) -> CliResult<ExitCode> {
    let session_config = config.session_config()?;
    let payloads = RandomPayloadSource::new(&config.payload_config())
        .map_err(|err| CliError::usage(err.to_string()))?;
    let store = match open_store(&config, false) {
        Ok(store) => store,
        Err(err) => {
            error!(stage = "open", error = %err, "power-on maintenance aborted");
            log_summary(&SessionSummary::default());
            return Err(err);
        }
    };
    info!(
        db = %config.store.path.display(),
        pause_secs = config.session.pause_secs,
        progress_interval_secs = config.session.progress_interval_secs,
        verify_interval = config.session.verify_interval,
        max_iterations = ?config.session.max_iterations,
        "sdstress starting"
    );

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(watch_interrupt(cancel.clone()));
    let maintenance_config = config.maintenance_config();
    let worker = tokio::task::spawn_blocking(move || {
        let clock = SystemClock::new();
        if let Err(abort) = PowerOnMaintenance::new(&store, &clock, maintenance_config).run() {
            error!(error = %abort.error, "power-on maintenance aborted");
            log_summary(&summarize(&store, SessionCounters::default()));
            return Err(CliError::runtime(format!("maintenance aborted: {}", abort.error)));
        }
        let mut session = StressSession::new(&store, clock, payloads, session_config);
        let outcome = session.run(&cancel);
        if outcome.termination.is_failure() {
            return Err(CliError::runtime(outcome.termination.describe()));
        }
        Ok(ExitCode::SUCCESS)
    });
    let result = worker
        .await
        .map_err(|err| CliError::runtime(format!("session worker failed: {err}")))?;
    watcher.abort();
    result
}

/// Cancels `cancel` on the first interrupt signal.
async fn watch_interrupt(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
        Err(err) => warn!(error = %err, "interrupt handler unavailable"),
    }
}

// ============================================================================
// SECTION: Maintain Command
// ============================================================================

/// Runs power-on maintenance only.
fn command_maintain(config: &StressConfig) -> CliResult<ExitCode> {
    let store = open_store(config, false)?;
    let clock = SystemClock::new();
    let report = PowerOnMaintenance::new(&store, &clock, config.maintenance_config())
        .run()
        .map_err(|abort| CliError::runtime(format!("maintenance aborted: {}", abort.error)))?;
    let records = report
        .records_at_startup
        .map_or_else(|| "unknown".to_string(), |count| count.to_string());
    write_stdout_line(&format!(
        "maintenance complete: records={records} removed_files={} recovery_attempted={} \
         low_space={}",
        report.removed_files.len(),
        report.recovery_attempted,
        report.low_space
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Inspection Commands
// ============================================================================

/// Verifies every stored record without writing to the store.
fn command_verify(config: &StressConfig) -> CliResult<ExitCode> {
    let store = open_store(config, true)?;
    let clock = SystemClock::new();
    let mut verifier = IntegrityVerifier::new(VerifierConfig {
        scope: VerifyScope::Full,
        page_size: config.verifier.page_size,
        record_events: false,
    });
    let report = verifier
        .verify_batch(&store, &clock, 0)
        .map_err(|err| CliError::runtime(format!("verification failed: {err}")))?;
    write_stdout_line(&format!(
        "checked={} corrupt={}",
        report.checked,
        report.mismatched.len()
    ))?;
    for id in &report.mismatched {
        write_stdout_line(&format!("corrupt record id={id}"))?;
    }
    if report.mismatched.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILURE))
    }
}

/// Prints a summary of an existing store without writing to it.
fn command_report(config: &StressConfig) -> CliResult<ExitCode> {
    let store = open_store(config, true)?;
    let summary = summarize(&store, SessionCounters::default());
    write_stdout_line(&summary.to_string())?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the configured store, read-only when `read_only` is set.
fn open_store(config: &StressConfig, read_only: bool) -> CliResult<SqliteRecordStore> {
    let mut store_config = config.store_config();
    store_config.read_only = read_only;
    let store = SqliteRecordStore::open(store_config)
        .map_err(|err| CliError::runtime(format!("failed to open store: {err}")))?;
    if read_only {
        store
            .ensure_schema()
            .map_err(|err| CliError::runtime(format!("store is not usable: {err}")))?;
    }
    Ok(store)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::runtime(format!("failed to write stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the mapped exit code.
fn emit_error(error: &CliError) -> ExitCode {
    let _ = write_stderr_line(&format!("sdstress: {error}"));
    error.exit_code()
}
