// crates/sdstress-core/src/core/hashing.rs
// ============================================================================
// Module: sdstress Checksum Codec
// Description: Deterministic content digests for stored payloads.
// Purpose: Detect accidental corruption of persisted record values.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Every test record stores the digest of its value at write time. The
//! verifier recomputes the digest from the value read back and compares. The
//! digest is unsalted SHA-256 rendered as lowercase hex, so it is identical
//! across process restarts and platforms.
//!
//! The digest targets accidental corruption (bit rot, torn writes), not
//! adversarial tampering.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::records::StoredValue;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported digest algorithms for record checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the length of the hex-encoded digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }
}

/// Default digest algorithm for record checksums.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Deterministic content hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Hash algorithm identifier.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Creates a new digest from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: hex_encode(bytes),
        }
    }

    /// Returns true when the stored checksum text equals this digest.
    #[must_use]
    pub fn matches(&self, stored: &str) -> bool {
        self.value == stored
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing record digests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The payload could not be decoded into bytes to hash.
    #[error("payload encoding error: {0}")]
    Encoding(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Hashes raw bytes using the provided algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest::new(HashAlgorithm::Sha256, &digest)
        }
    }
}

/// Computes the checksum of a record payload with the default algorithm.
#[must_use]
pub fn digest_payload(payload: &str) -> HashDigest {
    hash_bytes(DEFAULT_HASH_ALGORITHM, payload.as_bytes())
}

/// Computes the checksum of a value read back from the store.
///
/// # Errors
///
/// Returns [`HashError::Encoding`] when the stored value is unreadable.
pub fn digest_stored_value(value: &StoredValue) -> Result<HashDigest, HashError> {
    match value {
        StoredValue::Text(text) => Ok(digest_payload(text)),
        StoredValue::Unreadable(reason) => Err(HashError::Encoding(reason.clone())),
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
