// crates/sdstress-core/src/core/mod.rs
// ============================================================================
// Module: sdstress Core Types
// Description: Record, event, timestamp, digest, and summary types.
// Purpose: Define the persisted data model shared by the store and runtime.
// Dependencies: serde, sha2, time
// ============================================================================

//! ## Overview
//! Core types describe what the harness persists (test records and system
//! events) and what it derives from them (session summaries). They carry no
//! storage logic; adapters translate them to and from the engine schema.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod records;
pub mod summary;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::EventId;
pub use identifiers::RecordId;
pub use records::EventType;
pub use records::NewEvent;
pub use records::NewRecord;
pub use records::StoredRecord;
pub use records::StoredValue;
pub use records::SystemEvent;
pub use records::TestRecord;
pub use summary::SessionSummary;
pub use time::Timestamp;
