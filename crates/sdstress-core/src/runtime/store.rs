// crates/sdstress-core/src/runtime/store.rs
// ============================================================================
// Module: sdstress In-Memory Store
// Description: In-memory record store with fault injection for tests.
// Purpose: Exercise the harness protocol without a storage engine.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryRecordStore`] implements [`RecordStore`] over a mutex-guarded
//! map. Besides the contract itself it exposes fault-injection hooks
//! (corrupting a stored value, failing inserts, failing integrity checks,
//! constraining free space) so session and maintenance behavior can be tested
//! deterministically. It is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::EventId;
use crate::core::NewEvent;
use crate::core::NewRecord;
use crate::core::RecordId;
use crate::core::StoredRecord;
use crate::core::StoredValue;
use crate::core::SystemEvent;
use crate::interfaces::CheckpointReport;
use crate::interfaces::IntegrityReport;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Stored row contents.
#[derive(Debug, Clone)]
struct MemoryRecord {
    /// Persisted timestamp text.
    timestamp: String,
    /// Payload column contents.
    value: StoredValue,
    /// Checksum column contents.
    checksum: Option<String>,
}

/// Mutable store state.
#[derive(Debug)]
struct MemoryState {
    /// True once `ensure_schema` ran.
    schema_ready: bool,
    /// Records keyed by raw id.
    records: BTreeMap<i64, MemoryRecord>,
    /// Events in append order.
    events: Vec<SystemEvent>,
    /// Last assigned record id.
    last_record_id: i64,
    /// Last assigned event id.
    last_event_id: i64,
    /// Inserts that will fail before one succeeds.
    failing_inserts: u32,
    /// Event appends that will fail before one succeeds.
    failing_event_appends: u32,
    /// Integrity checks that will report a problem.
    failing_integrity_checks: u32,
    /// When true, `recover` fails.
    recover_fails: bool,
    /// Reported free space.
    available_space: u64,
    /// Side files reported by the next cleanup.
    transient_files: Vec<PathBuf>,
    /// Checkpoints run.
    checkpoints: u64,
    /// Recovery attempts made.
    recoveries: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            schema_ready: false,
            records: BTreeMap::new(),
            events: Vec::new(),
            last_record_id: 0,
            last_event_id: 0,
            failing_inserts: 0,
            failing_event_appends: 0,
            failing_integrity_checks: 0,
            recover_fails: false,
            available_space: u64::MAX,
            transient_files: Vec::new(),
            checkpoints: 0,
            recoveries: 0,
        }
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory record store for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("in-memory record store mutex poisoned".to_string()))
    }

    /// Applies a fault-injection change to the state.
    fn inject(&self, change: impl FnOnce(&mut MemoryState)) {
        if let Ok(mut guard) = self.state.lock() {
            change(&mut guard);
        }
    }

    /// Overwrites a stored value without touching its checksum.
    pub fn corrupt_value(&self, id: RecordId, value: impl Into<String>) {
        let value = value.into();
        self.inject(|state| {
            if let Some(record) = state.records.get_mut(&id.get()) {
                record.value = StoredValue::Text(value);
            }
        });
    }

    /// Marks a stored value as undecodable.
    pub fn make_value_unreadable(&self, id: RecordId) {
        self.inject(|state| {
            if let Some(record) = state.records.get_mut(&id.get()) {
                record.value = StoredValue::Unreadable("injected decode failure".to_string());
            }
        });
    }

    /// Clears a stored checksum.
    pub fn drop_checksum(&self, id: RecordId) {
        self.inject(|state| {
            if let Some(record) = state.records.get_mut(&id.get()) {
                record.checksum = None;
            }
        });
    }

    /// Makes the next `count` inserts fail.
    pub fn fail_next_inserts(&self, count: u32) {
        self.inject(|state| state.failing_inserts = count);
    }

    /// Makes the next `count` event appends fail.
    pub fn fail_next_event_appends(&self, count: u32) {
        self.inject(|state| state.failing_event_appends = count);
    }

    /// Makes the next `count` integrity checks report a problem.
    pub fn fail_next_integrity_checks(&self, count: u32) {
        self.inject(|state| state.failing_integrity_checks = count);
    }

    /// Controls whether `recover` fails.
    pub fn set_recover_fails(&self, fails: bool) {
        self.inject(|state| state.recover_fails = fails);
    }

    /// Sets the reported free space.
    pub fn set_available_space(&self, bytes: u64) {
        self.inject(|state| state.available_space = bytes);
    }

    /// Registers a side file to be reported by the next cleanup.
    pub fn add_transient_file(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.inject(|state| state.transient_files.push(path));
    }

    /// Returns true once `ensure_schema` ran.
    #[must_use]
    pub fn schema_ready(&self) -> bool {
        self.state.lock().is_ok_and(|state| state.schema_ready)
    }

    /// Returns the number of recovery attempts.
    #[must_use]
    pub fn recovery_attempts(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.recoveries)
    }

    /// Returns the number of checkpoints run.
    #[must_use]
    pub fn checkpoint_count(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.checkpoints)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.lock()?.schema_ready = true;
        Ok(())
    }

    fn insert_record(&self, record: &NewRecord) -> Result<RecordId, StoreError> {
        let mut state = self.lock()?;
        if state.failing_inserts > 0 {
            state.failing_inserts -= 1;
            return Err(StoreError::Io("injected insert failure".to_string()));
        }
        state.last_record_id += 1;
        let raw = state.last_record_id;
        state.records.insert(
            raw,
            MemoryRecord {
                timestamp: record.timestamp.to_persisted(),
                value: StoredValue::Text(record.value.clone()),
                checksum: Some(record.checksum.clone()),
            },
        );
        RecordId::from_raw(raw).ok_or_else(|| StoreError::Invalid(format!("invalid record id {raw}")))
    }

    fn scan_records(
        &self,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let state = self.lock()?;
        let start = after.map_or(i64::MIN, |id| id.get().saturating_add(1));
        let records = state
            .records
            .range(start ..)
            .take(limit)
            .filter_map(|(raw, record)| {
                RecordId::from_raw(*raw).map(|id| StoredRecord {
                    id,
                    timestamp: record.timestamp.clone(),
                    value: record.value.clone(),
                    checksum: record.checksum.clone(),
                })
            })
            .collect();
        Ok(records)
    }

    fn count_records(&self) -> Result<u64, StoreError> {
        let state = self.lock()?;
        u64::try_from(state.records.len())
            .map_err(|_| StoreError::Invalid("record count overflow".to_string()))
    }

    fn record_span(&self) -> Result<Option<(String, String)>, StoreError> {
        let state = self.lock()?;
        let first = state.records.values().next().map(|record| record.timestamp.clone());
        let last = state.records.values().next_back().map(|record| record.timestamp.clone());
        Ok(first.zip(last))
    }

    fn append_event(&self, event: &NewEvent) -> Result<EventId, StoreError> {
        let mut state = self.lock()?;
        if state.failing_event_appends > 0 {
            state.failing_event_appends -= 1;
            return Err(StoreError::Io("injected event append failure".to_string()));
        }
        state.last_event_id += 1;
        let raw = state.last_event_id;
        let id = EventId::from_raw(raw)
            .ok_or_else(|| StoreError::Invalid(format!("invalid event id {raw}")))?;
        state.events.push(SystemEvent {
            id,
            timestamp: event.timestamp.to_persisted(),
            event_type: Ok(event.event_type),
            details: event.details.clone(),
        });
        Ok(id)
    }

    fn list_events(&self) -> Result<Vec<SystemEvent>, StoreError> {
        Ok(self.lock()?.events.clone())
    }

    fn integrity_check(&self) -> Result<IntegrityReport, StoreError> {
        let mut state = self.lock()?;
        if state.failing_integrity_checks > 0 {
            state.failing_integrity_checks -= 1;
            return Ok(IntegrityReport {
                problems: vec!["injected integrity failure".to_string()],
            });
        }
        Ok(IntegrityReport::ok())
    }

    fn checkpoint(&self) -> Result<CheckpointReport, StoreError> {
        self.lock()?.checkpoints += 1;
        Ok(CheckpointReport::default())
    }

    fn remove_transient_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        Ok(std::mem::take(&mut self.lock()?.transient_files))
    }

    fn recover(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.recoveries += 1;
        if state.recover_fails {
            return Err(StoreError::Corrupt("injected recovery failure".to_string()));
        }
        Ok(())
    }

    fn size_bytes(&self) -> Result<u64, StoreError> {
        let state = self.lock()?;
        let bytes: usize = state
            .records
            .values()
            .map(|record| {
                let value_len = match &record.value {
                    StoredValue::Text(text) => text.len(),
                    StoredValue::Unreadable(_) => 0,
                };
                record.timestamp.len() + value_len + record.checksum.as_ref().map_or(0, String::len)
            })
            .sum();
        u64::try_from(bytes).map_err(|_| StoreError::Invalid("store size overflow".to_string()))
    }

    fn available_space_bytes(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.available_space)
    }
}
