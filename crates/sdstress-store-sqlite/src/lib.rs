// crates/sdstress-store-sqlite/src/lib.rs
// ============================================================================
// Module: sdstress SQLite Store
// Description: SQLite-backed RecordStore implementation.
// Purpose: Persist test records and system events in a single database file.
// Dependencies: sdstress-core, rusqlite, fs2
// ============================================================================

//! ## Overview
//! This crate provides the production [`sdstress_core::RecordStore`] used by
//! the harness. It owns connection pragmas, schema versioning, side-file
//! cleanup, and the bounded recovery path used by power-on maintenance.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteRecordStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
