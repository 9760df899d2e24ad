// crates/sdstress-core/src/runtime/generator.rs
// ============================================================================
// Module: sdstress Write Generator
// Description: Builds checksummed records and submits them to the store.
// Purpose: Append one durable, self-verifying row per session iteration.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Record creation is split into [`WriteGenerator::prepare`] (payload,
//! checksum, timestamp) and [`submit_record`] (insert). The generator never
//! retries; the session decides whether the same prepared record is
//! submitted again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::NewRecord;
use crate::core::TestRecord;
use crate::core::hashing::digest_payload;
use crate::interfaces::Clock;
use crate::interfaces::PayloadSource;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Produces checksummed test records.
#[derive(Debug, Clone)]
pub struct WriteGenerator<P> {
    /// Payload source.
    source: P,
}

impl<P: PayloadSource> WriteGenerator<P> {
    /// Creates a generator over a payload source.
    #[must_use]
    pub const fn new(source: P) -> Self {
        Self {
            source,
        }
    }

    /// Prepares a record: draws a payload, digests it, and timestamps it.
    pub fn prepare<C: Clock>(&mut self, clock: &C) -> NewRecord {
        let value = self.source.next_payload();
        let checksum = digest_payload(&value).value;
        NewRecord {
            timestamp: clock.now(),
            value,
            checksum,
        }
    }

    /// Prepares and submits one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    pub fn generate_record<S: RecordStore, C: Clock>(
        &mut self,
        store: &S,
        clock: &C,
    ) -> Result<TestRecord, StoreError> {
        let record = self.prepare(clock);
        submit_record(store, &record)
    }
}

/// Inserts a prepared record and returns the acknowledged row.
///
/// # Errors
///
/// Returns [`StoreError`] when the insert fails.
pub fn submit_record<S: RecordStore>(
    store: &S,
    record: &NewRecord,
) -> Result<TestRecord, StoreError> {
    let id = store.insert_record(record)?;
    Ok(TestRecord::acknowledged(id, record.clone()))
}
