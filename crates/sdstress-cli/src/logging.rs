// crates/sdstress-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber installation for the harness binary.
// Purpose: Mirror every log line to stderr and an append-mode log file.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Installs a global subscriber with two `fmt` layers: compact, colored output
//! on stderr and plain text appended to the configured log file. The filter
//! comes from `SDSTRESS_LOG` when set and from configuration otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding a filter directive override.
pub(crate) const LOG_ENV_VAR: &str = "SDSTRESS_LOG";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup errors.
#[derive(Debug, Error)]
pub(crate) enum LoggingError {
    /// Log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    File {
        /// Log file path.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Filter directive is malformed.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    Init(String),
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Builds the filter from `env_value` or falls back to `default_filter`.
pub(crate) fn resolve_filter(
    env_value: Option<&str>,
    default_filter: &str,
) -> Result<EnvFilter, LoggingError> {
    let directive = env_value.map(str::trim).filter(|value| !value.is_empty());
    let directive = directive.unwrap_or(default_filter);
    EnvFilter::try_new(directive).map_err(|err| LoggingError::Filter(err.to_string()))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LoggingError`] when the log file cannot be opened, the filter is
/// malformed, or a subscriber is already installed.
pub(crate) fn init_logging(log_file: &Path, default_filter: &str) -> Result<(), LoggingError> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let filter = resolve_filter(env_value.as_deref(), default_filter)?;
    let file = open_log_file(log_file)?;

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false).compact();
    let file_layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))
}

/// Opens the log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<fs::File, LoggingError> {
    let to_error = |source: io::Error| LoggingError::File {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    OpenOptions::new().create(true).append(true).open(path).map_err(to_error)
}
