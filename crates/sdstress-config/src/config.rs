// crates/sdstress-config/src/config.rs
// ============================================================================
// Module: sdstress Configuration
// Description: Configuration loading and validation for the stress harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: sdstress-core, sdstress-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! When no file is named and no default file exists, built-in defaults apply.
//! Command-line overrides are written into the loaded [`StressConfig`] and
//! re-validated with [`StressConfig::validate`] before any runtime config is
//! derived from it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::ffi::OsString;
use std::fs;
use std::num::NonZeroU64;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use sdstress_core::MaintenanceConfig;
use sdstress_core::PayloadConfig;
use sdstress_core::SessionConfig;
use sdstress_core::VerifierConfig;
use sdstress_core::VerifyScope;
use sdstress_core::runtime::maintenance::DEFAULT_FATAL_FREE_SPACE_BYTES;
use sdstress_core::runtime::maintenance::DEFAULT_MIN_FREE_SPACE_MB;
use sdstress_core::runtime::payload::DEFAULT_PAYLOAD_ALPHABET;
use sdstress_core::runtime::payload::DEFAULT_PAYLOAD_LENGTH;
use sdstress_core::runtime::session::DEFAULT_PAUSE;
use sdstress_core::runtime::session::DEFAULT_PROGRESS_INTERVAL;
use sdstress_core::runtime::session::DEFAULT_VERIFY_INTERVAL;
use sdstress_core::runtime::verifier::DEFAULT_VERIFY_PAGE_SIZE;
use sdstress_store_sqlite::SqliteStoreConfig;
use sdstress_store_sqlite::SqliteStoreMode;
use sdstress_store_sqlite::SqliteSyncMode;
use sdstress_store_sqlite::store::DEFAULT_BUSY_TIMEOUT_MS;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "sdstress.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SDSTRESS_CONFIG";
/// Default store file.
pub const DEFAULT_STORE_PATH: &str = "stress_test.db";
/// Default log file.
pub const DEFAULT_LOG_FILE: &str = "sqlite_test.log";
/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum payload length in characters.
pub(crate) const MAX_PAYLOAD_LENGTH: usize = 1024 * 1024;
/// Maximum payload alphabet length in characters.
pub(crate) const MAX_ALPHABET_LENGTH: usize = 256;
/// Maximum busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum pause between iterations in seconds.
pub(crate) const MAX_PAUSE_SECS: u64 = 86_400;
/// Maximum verifier page size.
pub(crate) const MAX_VERIFY_PAGE_SIZE: usize = 100_000;
/// Maximum log filter length.
pub(crate) const MAX_LOG_FILTER_LENGTH: usize = 1024;
/// Bytes per megabyte for threshold math.
const BYTES_PER_MB: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StressConfig {
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Payload generation configuration.
    #[serde(default)]
    pub writer: WriterConfig,
    /// Session loop configuration.
    #[serde(default)]
    pub session: SessionSettings,
    /// Verification configuration.
    #[serde(default)]
    pub verifier: VerifierSettings,
    /// Power-on maintenance configuration.
    #[serde(default)]
    pub maintenance: MaintenanceSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the configuration was read from, if any (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl StressConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// Resolution order is `path`, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`] when present, then built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved =
            resolve_path(path, env::var_os(CONFIG_ENV_VAR), Path::new(DEFAULT_CONFIG_NAME))?;
        let Some(resolved) = resolved else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        Self::load_file(&resolved)
    }

    /// Loads and validates a specific configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, malformed, or
    /// fails validation.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.writer.validate()?;
        self.session.validate()?;
        self.verifier.validate()?;
        self.maintenance.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns the store configuration for the read-write session.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.store.path.clone(),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
            sync_mode: self.store.sync_mode,
            read_only: false,
        }
    }

    /// Returns the payload source configuration.
    #[must_use]
    pub fn payload_config(&self) -> PayloadConfig {
        PayloadConfig {
            length: self.writer.payload_length,
            alphabet: self.writer.alphabet.clone(),
            seed: self.writer.seed,
        }
    }

    /// Returns the verifier configuration.
    #[must_use]
    pub const fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            scope: self.verifier.scope,
            page_size: self.verifier.page_size,
            record_events: true,
        }
    }

    /// Returns the maintenance configuration.
    #[must_use]
    pub const fn maintenance_config(&self) -> MaintenanceConfig {
        MaintenanceConfig {
            min_free_space_bytes: self.maintenance.min_free_space_mb.saturating_mul(BYTES_PER_MB),
            fatal_free_space_bytes: self.maintenance.fatal_free_space_bytes,
        }
    }

    /// Returns the session loop configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the verify interval is zero.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let verify_interval = NonZeroU64::new(self.session.verify_interval).ok_or_else(|| {
            ConfigError::Invalid("session.verify_interval must be at least 1".to_string())
        })?;
        Ok(SessionConfig {
            pause: Duration::from_secs(self.session.pause_secs),
            progress_interval: Duration::from_secs(self.session.progress_interval_secs),
            verify_interval,
            max_iterations: self.session.max_iterations,
            verifier: self.verifier_config(),
        })
    }
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be between 1 and {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Payload generation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Payload length in characters.
    #[serde(default = "default_payload_length")]
    pub payload_length: usize,
    /// Characters payloads are drawn from.
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    /// Optional RNG seed for reproducible payloads.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            payload_length: default_payload_length(),
            alphabet: default_alphabet(),
            seed: None,
        }
    }
}

impl WriterConfig {
    /// Validates payload configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.payload_length == 0 || self.payload_length > MAX_PAYLOAD_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "writer.payload_length must be between 1 and {MAX_PAYLOAD_LENGTH}"
            )));
        }
        if self.alphabet.is_empty() {
            return Err(ConfigError::Invalid("writer.alphabet must be non-empty".to_string()));
        }
        if !self.alphabet.is_ascii() {
            return Err(ConfigError::Invalid("writer.alphabet must be ascii".to_string()));
        }
        if self.alphabet.len() > MAX_ALPHABET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "writer.alphabet exceeds {MAX_ALPHABET_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// Session loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    /// Pause between iterations in seconds.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    /// Minimum seconds between progress log lines.
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,
    /// Iterations between verification passes.
    #[serde(default = "default_verify_interval")]
    pub verify_interval: u64,
    /// Optional iteration limit.
    #[serde(default)]
    pub max_iterations: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pause_secs: default_pause_secs(),
            progress_interval_secs: default_progress_interval_secs(),
            verify_interval: default_verify_interval(),
            max_iterations: None,
        }
    }
}

impl SessionSettings {
    /// Validates session configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pause_secs > MAX_PAUSE_SECS {
            return Err(ConfigError::Invalid(format!(
                "session.pause_secs must not exceed {MAX_PAUSE_SECS}"
            )));
        }
        if self.progress_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.progress_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.verify_interval == 0 {
            return Err(ConfigError::Invalid(
                "session.verify_interval must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::Invalid(
                "session.max_iterations must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Verification configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierSettings {
    /// Rows re-read on each pass.
    #[serde(default)]
    pub scope: VerifyScope,
    /// Rows fetched per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            scope: VerifyScope::default(),
            page_size: default_page_size(),
        }
    }
}

impl VerifierSettings {
    /// Validates verifier configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_VERIFY_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "verifier.page_size must be between 1 and {MAX_VERIFY_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

/// Power-on maintenance configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceSettings {
    /// Free space below which a low-space warning is recorded (MB).
    #[serde(default = "default_min_free_space_mb")]
    pub min_free_space_mb: u64,
    /// Free space below which maintenance aborts (bytes).
    #[serde(default = "default_fatal_free_space_bytes")]
    pub fatal_free_space_bytes: u64,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            min_free_space_mb: default_min_free_space_mb(),
            fatal_free_space_bytes: default_fatal_free_space_bytes(),
        }
    }
}

impl MaintenanceSettings {
    /// Validates maintenance thresholds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fatal_free_space_bytes == 0 {
            return Err(ConfigError::Invalid(
                "maintenance.fatal_free_space_bytes must be greater than zero".to_string(),
            ));
        }
        let warning_bytes = self.min_free_space_mb.saturating_mul(BYTES_PER_MB);
        if warning_bytes < self.fatal_free_space_bytes {
            return Err(ConfigError::Invalid(
                "maintenance.min_free_space_mb must not be below \
                 maintenance.fatal_free_space_bytes"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Append-mode log file.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    /// Default filter directive when `SDSTRESS_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("logging.file", &self.file.to_string_lossy())?;
        let filter = self.filter.trim();
        if filter.is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        if filter.len() > MAX_LOG_FILTER_LENGTH {
            return Err(ConfigError::Invalid("logging.filter exceeds max length".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default store path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default store busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default payload length.
const fn default_payload_length() -> usize {
    DEFAULT_PAYLOAD_LENGTH
}

/// Returns the default payload alphabet.
fn default_alphabet() -> String {
    DEFAULT_PAYLOAD_ALPHABET.to_string()
}

/// Returns the default pause in seconds.
const fn default_pause_secs() -> u64 {
    DEFAULT_PAUSE.as_secs()
}

/// Returns the default progress interval in seconds.
const fn default_progress_interval_secs() -> u64 {
    DEFAULT_PROGRESS_INTERVAL.as_secs()
}

/// Returns the default verification interval.
const fn default_verify_interval() -> u64 {
    DEFAULT_VERIFY_INTERVAL.get()
}

/// Returns the default verifier page size.
const fn default_page_size() -> usize {
    DEFAULT_VERIFY_PAGE_SIZE
}

/// Returns the default low-space warning threshold.
const fn default_min_free_space_mb() -> u64 {
    DEFAULT_MIN_FREE_SPACE_MB
}

/// Returns the default fatal space threshold.
const fn default_fatal_free_space_bytes() -> u64 {
    DEFAULT_FATAL_FREE_SPACE_BYTES
}

/// Returns the default log file.
fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

/// Returns the default log filter.
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI, environment, or the default file.
///
/// Returns `None` when nothing is named and the default file is absent.
fn resolve_path(
    path: Option<&Path>,
    env_path: Option<OsString>,
    default_path: &Path,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = env_path.filter(|value| !value.is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    if default_path.is_file() {
        return Ok(Some(default_path.to_path_buf()));
    }
    Ok(None)
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
