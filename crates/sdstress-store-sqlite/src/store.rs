// crates/sdstress-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Record Store
// Description: RecordStore backed by an SQLite database file.
// Purpose: Persist test records and system events on the device under test.
// Dependencies: sdstress-core, rusqlite, fs2, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements [`RecordStore`] over a single `SQLite` connection.
//! Rows are decoded column by column so a damaged payload is reported as
//! [`StoredValue::Unreadable`] instead of aborting the scan. Maintenance
//! operations (checkpoint, side-file cleanup, recovery) close and reopen the
//! connection; all schema statements are idempotent so an externally opened
//! inspector never sees a half-initialized store.
//! Security posture: database contents are untrusted and may have been
//! modified behind the harness's back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::types::ValueRef;
use sdstress_core::CheckpointReport;
use sdstress_core::EventId;
use sdstress_core::EventType;
use sdstress_core::IntegrityReport;
use sdstress_core::NewEvent;
use sdstress_core::NewRecord;
use sdstress_core::RecordId;
use sdstress_core::RecordStore;
use sdstress_core::StoreError;
use sdstress_core::StoredRecord;
use sdstress_core::StoredValue;
use sdstress_core::SystemEvent;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Side-file suffixes created by the engine next to the store file.
const WAL_SUFFIX: &str = "-wal";
/// Shared-memory index suffix.
const SHM_SUFFIX: &str = "-shm";
/// Rollback journal suffix.
const JOURNAL_SUFFIX: &str = "-journal";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` record store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - A `read_only` store never creates files or mutates data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Open without write access (external inspection).
    #[serde(default)]
    pub read_only: bool,
}

impl SqliteStoreConfig {
    /// Returns a read-write configuration with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_only: false,
        }
    }

    /// Returns the same configuration opened read-only.
    #[must_use]
    pub fn into_read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding record payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store file or index corruption.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Mutation attempted on a read-only store.
    #[error("sqlite store is read-only: {0}")]
    ReadOnly(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::ReadOnly(message) => Self::ReadOnly(message),
        }
    }
}

/// Classifies an engine error by its extended code.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    let message = err.to_string();
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
            SqliteStoreError::Corrupt(message)
        }
        Some(ErrorCode::DiskFull | ErrorCode::SystemIoFailure | ErrorCode::CannotOpen) => {
            SqliteStoreError::Io(message)
        }
        Some(ErrorCode::ReadOnly) => SqliteStoreError::ReadOnly(message),
        _ => SqliteStoreError::Db(message),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed record store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - The connection slot is `None` only while maintenance has it closed or a
///   reopen failed.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection slot guarded by a mutex.
    connection: Arc<Mutex<Option<Connection>>>,
}

impl SqliteRecordStore {
    /// Opens an `SQLite`-backed record store.
    ///
    /// The schema is not created here; see [`RecordStore::ensure_schema`].
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid or the database
    /// cannot be opened.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        if config.read_only {
            if !config.path.is_file() {
                return Err(SqliteStoreError::Io(format!(
                    "store file not found: {}",
                    config.path.display()
                )));
            }
        } else {
            ensure_parent_dir(&config.path)?;
        }
        let connection = open_connection(&config)?;
        debug!(path = %config.path.display(), read_only = config.read_only, "sqlite store opened");
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(Some(connection))),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the primary store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Closes the connection; later calls fail until the store is reopened.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the engine refuses to close.
    pub fn close(&self) -> Result<(), SqliteStoreError> {
        let mut slot = self.lock()?;
        close_slot(&mut slot)
    }

    /// Locks the connection slot.
    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }

    /// Runs `action` against the open connection.
    fn with_connection<T>(
        &self,
        action: impl FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut slot = self.lock()?;
        let connection = slot
            .as_mut()
            .ok_or_else(|| SqliteStoreError::Io("sqlite connection is closed".to_string()))?;
        action(connection)
    }

    /// Fails when the store was opened read-only.
    fn ensure_writable(&self, operation: &str) -> Result<(), SqliteStoreError> {
        if self.config.read_only {
            return Err(SqliteStoreError::ReadOnly(format!("{operation} refused")));
        }
        Ok(())
    }

    /// Closes the connection, clears side files no connection owns, and
    /// reopens.
    ///
    /// In WAL mode the engine deletes `-wal` and `-shm` when the last
    /// connection closes, so files that survive our close belong to another
    /// connection and are left alone; the returned list names the files the
    /// close released. In rollback mode inert files are removed only while
    /// this connection holds the RESERVED lock.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when a side file cannot be removed or the
    /// store cannot be reopened.
    pub fn cleanup_side_files(&self) -> Result<Vec<PathBuf>, SqliteStoreError> {
        self.ensure_writable("side-file cleanup")?;
        let mut slot = self.lock()?;
        let present = existing_side_files(&self.config.path);
        close_slot(&mut slot)?;
        let released: Vec<PathBuf> = present.into_iter().filter(|path| !path.exists()).collect();
        let held = existing_side_files(&self.config.path).len();
        let connection = open_connection(&self.config)?;
        let removed = match self.config.journal_mode {
            SqliteStoreMode::Wal => {
                if held > 0 {
                    debug!(held, "side files still open elsewhere; left to the engine");
                }
                Ok(released)
            }
            SqliteStoreMode::Delete => {
                remove_unowned_side_files(&connection, &self.config.path).map(|mut removed| {
                    removed.extend(released);
                    removed
                })
            }
        };
        *slot = Some(connection);
        removed
    }

    /// Reopens the connection, checkpoints, rebuilds indexes, and re-checks
    /// integrity.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Corrupt`] when problems remain afterwards.
    pub fn repair(&self) -> Result<(), SqliteStoreError> {
        self.ensure_writable("recovery")?;
        let mut slot = self.lock()?;
        if slot.is_some() {
            close_slot(&mut slot)?;
        }
        let connection = open_connection(&self.config)?;
        run_checkpoint(&connection)?;
        connection.execute_batch("REINDEX;").map_err(|err| db_error(&err))?;
        let report = run_integrity_check(&connection)?;
        *slot = Some(connection);
        if !report.is_ok() {
            return Err(SqliteStoreError::Corrupt(report.problems.join("; ")));
        }
        info!(path = %self.config.path.display(), "sqlite store recovered");
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let read_only = self.config.read_only;
        self.with_connection(|connection| {
            if read_only { validate_schema(connection) } else { initialize_schema(connection) }
        })
        .map_err(StoreError::from)
    }

    fn insert_record(&self, record: &NewRecord) -> Result<RecordId, StoreError> {
        self.ensure_writable("record insert")?;
        let raw = self.with_connection(|connection| {
            connection
                .execute(
                    "INSERT INTO test_data (timestamp, value, checksum) VALUES (?1, ?2, ?3)",
                    params![record.timestamp.to_persisted(), record.value, record.checksum],
                )
                .map_err(|err| db_error(&err))?;
            Ok(connection.last_insert_rowid())
        })?;
        RecordId::from_raw(raw)
            .ok_or_else(|| StoreError::Invalid(format!("engine assigned invalid record id {raw}")))
    }

    fn scan_records(
        &self,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let after = after.map_or(0, RecordId::get);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT id, timestamp, value, checksum FROM test_data WHERE id > ?1 ORDER BY \
                     id LIMIT ?2",
                )
                .map_err(|err| db_error(&err))?;
            let rows = statement
                .query_map(params![after, limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        decode_lossy_text(row.get_ref(1)?),
                        decode_value(row.get_ref(2)?),
                        decode_checksum(row.get_ref(3)?),
                    ))
                })
                .map_err(|err| db_error(&err))?;
            let mut records = Vec::new();
            for row in rows {
                let (raw, timestamp, value, checksum) = row.map_err(|err| db_error(&err))?;
                let id = RecordId::from_raw(raw).ok_or_else(|| {
                    SqliteStoreError::Invalid(format!("invalid record id {raw}"))
                })?;
                records.push(StoredRecord {
                    id,
                    timestamp,
                    value,
                    checksum,
                });
            }
            Ok(records)
        })
        .map_err(StoreError::from)
    }

    fn count_records(&self) -> Result<u64, StoreError> {
        let count = self.with_connection(|connection| {
            connection
                .query_row("SELECT COUNT(*) FROM test_data", [], |row| row.get::<_, i64>(0))
                .map_err(|err| db_error(&err))
        })?;
        u64::try_from(count).map_err(|_| StoreError::Invalid(format!("negative row count {count}")))
    }

    fn record_span(&self) -> Result<Option<(String, String)>, StoreError> {
        self.with_connection(|connection| {
            let first = query_edge_timestamp(
                connection,
                "SELECT timestamp FROM test_data ORDER BY id ASC LIMIT 1",
            )?;
            let last = query_edge_timestamp(
                connection,
                "SELECT timestamp FROM test_data ORDER BY id DESC LIMIT 1",
            )?;
            Ok(first.zip(last))
        })
        .map_err(StoreError::from)
    }

    fn append_event(&self, event: &NewEvent) -> Result<EventId, StoreError> {
        self.ensure_writable("event append")?;
        let raw = self.with_connection(|connection| {
            connection
                .execute(
                    "INSERT INTO system_events (timestamp, event_type, details) VALUES (?1, ?2, \
                     ?3)",
                    params![event.timestamp.to_persisted(), event.event_type.as_str(), event.details],
                )
                .map_err(|err| db_error(&err))?;
            Ok(connection.last_insert_rowid())
        })?;
        EventId::from_raw(raw)
            .ok_or_else(|| StoreError::Invalid(format!("engine assigned invalid event id {raw}")))
    }

    fn list_events(&self) -> Result<Vec<SystemEvent>, StoreError> {
        self.with_connection(|connection| {
            let mut statement = connection
                .prepare(
                    "SELECT id, timestamp, event_type, details FROM system_events ORDER BY id",
                )
                .map_err(|err| db_error(&err))?;
            let rows = statement
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        decode_lossy_text(row.get_ref(1)?),
                        decode_lossy_text(row.get_ref(2)?),
                        decode_lossy_text(row.get_ref(3)?),
                    ))
                })
                .map_err(|err| db_error(&err))?;
            let mut events = Vec::new();
            for row in rows {
                let (raw, timestamp, label, details) = row.map_err(|err| db_error(&err))?;
                let id = EventId::from_raw(raw)
                    .ok_or_else(|| SqliteStoreError::Invalid(format!("invalid event id {raw}")))?;
                let event_type = label.parse::<EventType>().map_err(|_| label.clone());
                events.push(SystemEvent {
                    id,
                    timestamp,
                    event_type,
                    details,
                });
            }
            Ok(events)
        })
        .map_err(StoreError::from)
    }

    fn integrity_check(&self) -> Result<IntegrityReport, StoreError> {
        self.with_connection(|connection| run_integrity_check(connection)).map_err(StoreError::from)
    }

    fn checkpoint(&self) -> Result<CheckpointReport, StoreError> {
        self.ensure_writable("checkpoint")?;
        self.with_connection(|connection| run_checkpoint(connection)).map_err(StoreError::from)
    }

    fn remove_transient_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        self.cleanup_side_files().map_err(StoreError::from)
    }

    fn recover(&self) -> Result<(), StoreError> {
        self.repair().map_err(StoreError::from)
    }

    fn size_bytes(&self) -> Result<u64, StoreError> {
        let (page_count, page_size) = self.with_connection(|connection| {
            let page_count: i64 = connection
                .query_row("PRAGMA page_count", [], |row| row.get(0))
                .map_err(|err| db_error(&err))?;
            let page_size: i64 = connection
                .query_row("PRAGMA page_size", [], |row| row.get(0))
                .map_err(|err| db_error(&err))?;
            Ok((page_count, page_size))
        })?;
        let pages = u64::try_from(page_count)
            .map_err(|_| StoreError::Invalid(format!("negative page count {page_count}")))?;
        let size = u64::try_from(page_size)
            .map_err(|_| StoreError::Invalid(format!("negative page size {page_size}")))?;
        Ok(pages.saturating_mul(size))
    }

    fn available_space_bytes(&self) -> Result<u64, StoreError> {
        let directory = match self.config.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs2::available_space(directory).map_err(|err| StoreError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = if config.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX
    };
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    if config.read_only {
        connection.execute_batch("PRAGMA query_only = ON;").map_err(|err| db_error(&err))?;
        return Ok(());
    }
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS test_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            value TEXT NOT NULL,
            checksum TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS system_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            details TEXT NOT NULL
        );",
    )
    .map_err(|err| db_error(&err))?;
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}

/// Validates an existing schema without writing (read-only stores).
fn validate_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    for table in ["test_data", "system_events"] {
        let present: Option<String> = connection
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        if present.is_none() {
            return Err(SqliteStoreError::Invalid(format!("missing table: {table}")));
        }
    }
    let has_meta: Option<String> = connection
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'store_meta'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    if has_meta.is_some() {
        let version: Option<i64> = connection
            .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(|err| db_error(&err))?;
        if let Some(value) = version
            && value != SCHEMA_VERSION
        {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    Ok(())
}

/// Runs `PRAGMA integrity_check` and collects diagnostics.
fn run_integrity_check(connection: &Connection) -> Result<IntegrityReport, SqliteStoreError> {
    let mut statement = connection.prepare("PRAGMA integrity_check").map_err(|err| db_error(&err))?;
    let rows = statement
        .query_map([], |row| Ok(decode_lossy_text(row.get_ref(0)?)))
        .map_err(|err| db_error(&err))?;
    let mut problems = Vec::new();
    for row in rows {
        let line = row.map_err(|err| db_error(&err))?;
        if line != "ok" {
            problems.push(line);
        }
    }
    Ok(IntegrityReport {
        problems,
    })
}

/// Runs a truncating WAL checkpoint.
fn run_checkpoint(connection: &Connection) -> Result<CheckpointReport, SqliteStoreError> {
    connection
        .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
            Ok(CheckpointReport {
                busy: row.get::<_, i64>(0)? != 0,
                log_frames: row.get(1)?,
                checkpointed_frames: row.get(2)?,
            })
        })
        .map_err(|err| db_error(&err))
}

/// Closes the connection held in `slot`, restoring it on failure.
fn close_slot(slot: &mut Option<Connection>) -> Result<(), SqliteStoreError> {
    let Some(connection) = slot.take() else {
        return Ok(());
    };
    connection.close().map_err(|(connection, err)| {
        *slot = Some(connection);
        db_error(&err)
    })
}

/// Returns `path` with `suffix` appended to the file name.
fn side_file(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns true when `path` exists as an empty file.
fn is_empty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file() && metadata.len() == 0)
}

/// Lists the side files currently present next to `store_path`.
fn existing_side_files(store_path: &Path) -> Vec<PathBuf> {
    [WAL_SUFFIX, SHM_SUFFIX, JOURNAL_SUFFIX]
        .into_iter()
        .map(|suffix| side_file(store_path, suffix))
        .filter(|path| path.exists())
        .collect()
}

/// Removes inert side files while holding the RESERVED lock.
///
/// Nothing is removed when another connection holds a write lock.
fn remove_unowned_side_files(
    connection: &Connection,
    store_path: &Path,
) -> Result<Vec<PathBuf>, SqliteStoreError> {
    match connection.execute_batch("BEGIN IMMEDIATE;") {
        Ok(()) => {}
        Err(err)
            if matches!(
                err.sqlite_error_code(),
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            ) =>
        {
            debug!(path = %store_path.display(), "store locked elsewhere; side files kept");
            return Ok(Vec::new());
        }
        Err(err) => return Err(db_error(&err)),
    }
    let removed = remove_inert_side_files(store_path);
    connection.execute_batch("ROLLBACK;").map_err(|err| db_error(&err))?;
    removed
}

/// Removes side files that carry no committed data.
///
/// A non-empty write-ahead log or rollback journal may hold data the engine
/// still needs, so only empty ones are removed. The shared-memory index is
/// removed only when no write-ahead log remains.
fn remove_inert_side_files(store_path: &Path) -> Result<Vec<PathBuf>, SqliteStoreError> {
    let mut removed = Vec::new();
    let wal = side_file(store_path, WAL_SUFFIX);
    if is_empty_file(&wal) {
        remove_file(&wal, &mut removed)?;
    }
    let shm = side_file(store_path, SHM_SUFFIX);
    if shm.is_file() && !wal.exists() {
        remove_file(&shm, &mut removed)?;
    }
    let journal = side_file(store_path, JOURNAL_SUFFIX);
    if is_empty_file(&journal) {
        remove_file(&journal, &mut removed)?;
    }
    Ok(removed)
}

/// Removes a file and records it.
fn remove_file(path: &Path, removed: &mut Vec<PathBuf>) -> Result<(), SqliteStoreError> {
    fs::remove_file(path).map_err(|err| {
        SqliteStoreError::Io(format!("failed to remove {}: {err}", path.display()))
    })?;
    removed.push(path.to_path_buf());
    Ok(())
}

/// Reads one timestamp column from an edge row.
fn query_edge_timestamp(
    connection: &Connection,
    sql: &str,
) -> Result<Option<String>, SqliteStoreError> {
    connection
        .query_row(sql, [], |row| Ok(decode_lossy_text(row.get_ref(0)?)))
        .optional()
        .map_err(|err| db_error(&err))
}

/// Decodes a payload column, classifying anything but UTF-8 text as unreadable.
fn decode_value(value: ValueRef<'_>) -> StoredValue {
    match value {
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => StoredValue::Text(text.to_string()),
            Err(err) => StoredValue::Unreadable(format!("invalid utf-8: {err}")),
        },
        ValueRef::Null => StoredValue::Unreadable("value is NULL".to_string()),
        ValueRef::Blob(bytes) => {
            StoredValue::Unreadable(format!("value stored as {}-byte blob", bytes.len()))
        }
        ValueRef::Integer(_) | ValueRef::Real(_) => {
            StoredValue::Unreadable("value stored as a number".to_string())
        }
    }
}

/// Decodes a checksum column; anything but UTF-8 text is treated as missing.
fn decode_checksum(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
        _ => None,
    }
}

/// Decodes a column as display text without failing.
fn decode_lossy_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(number) => number.to_string(),
        ValueRef::Real(number) => number.to_string(),
        ValueRef::Null => String::new(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::panic,
        reason = "Test-only assertions are permitted."
    )]

    use std::fs;
    use std::path::Path;

    use super::SqliteStoreError;
    use super::remove_inert_side_files;
    use super::side_file;
    use super::validate_store_path;

    #[test]
    fn side_file_appends_suffix_to_file_name() {
        assert_eq!(
            side_file(Path::new("/data/stress_test.db"), "-wal"),
            Path::new("/data/stress_test.db-wal")
        );
    }

    #[test]
    fn store_path_rejects_overlong_component() {
        let long = "a".repeat(300);
        assert!(matches!(
            validate_store_path(Path::new(&long)),
            Err(SqliteStoreError::Invalid(_))
        ));
    }

    #[test]
    fn non_empty_write_ahead_log_and_its_index_are_kept() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = temp.path().join("stress_test.db");
        fs::write(&store, b"primary").unwrap();
        fs::write(side_file(&store, "-wal"), b"frames").unwrap();
        fs::write(side_file(&store, "-shm"), b"").unwrap();
        fs::write(side_file(&store, "-journal"), b"").unwrap();

        let removed = remove_inert_side_files(&store).unwrap();
        assert_eq!(removed, vec![side_file(&store, "-journal")]);
        assert!(side_file(&store, "-wal").exists());
        assert!(side_file(&store, "-shm").exists());
        assert!(store.exists());
    }

    #[test]
    fn empty_write_ahead_log_takes_its_index_with_it() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = temp.path().join("stress_test.db");
        fs::write(&store, b"primary").unwrap();
        fs::write(side_file(&store, "-wal"), b"").unwrap();
        fs::write(side_file(&store, "-shm"), b"index").unwrap();

        let removed = remove_inert_side_files(&store).unwrap();
        assert_eq!(removed, vec![side_file(&store, "-wal"), side_file(&store, "-shm")]);
        assert!(store.exists());
    }
}
