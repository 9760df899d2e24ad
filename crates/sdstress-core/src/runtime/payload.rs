// crates/sdstress-core/src/runtime/payload.rs
// ============================================================================
// Module: sdstress Payload Source
// Description: Pseudo-random text payloads over a configured alphabet.
// Purpose: Produce record values whose shape is fixed by configuration.
// Dependencies: crate::interfaces, rand
// ============================================================================

//! ## Overview
//! Payload length and alphabet are configuration so test conditions are
//! reproducible. An optional seed also makes the exact byte stream
//! reproducible; without it the generator is seeded from OS entropy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::interfaces::PayloadSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default payload length in characters.
pub const DEFAULT_PAYLOAD_LENGTH: usize = 1_000;
/// Default payload alphabet.
pub const DEFAULT_PAYLOAD_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Payload generation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadConfig {
    /// Characters per payload.
    pub length: usize,
    /// Characters to draw from.
    pub alphabet: String,
    /// Optional RNG seed.
    pub seed: Option<u64>,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_PAYLOAD_LENGTH,
            alphabet: DEFAULT_PAYLOAD_ALPHABET.to_string(),
            seed: None,
        }
    }
}

/// Payload configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload settings cannot produce a payload.
    #[error("invalid payload config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Random payload source backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomPayloadSource {
    /// Random number generator.
    rng: StdRng,
    /// Characters per payload.
    length: usize,
    /// Characters to draw from.
    alphabet: Vec<char>,
}

impl RandomPayloadSource {
    /// Creates a payload source from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Invalid`] when the length is zero or the
    /// alphabet is empty.
    pub fn new(config: &PayloadConfig) -> Result<Self, PayloadError> {
        if config.length == 0 {
            return Err(PayloadError::Invalid("payload length must be greater than zero".to_string()));
        }
        let alphabet: Vec<char> = config.alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(PayloadError::Invalid("payload alphabet must be non-empty".to_string()));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            length: config.length,
            alphabet,
        })
    }
}

impl PayloadSource for RandomPayloadSource {
    fn next_payload(&mut self) -> String {
        let mut payload = String::with_capacity(self.length);
        for _ in 0 .. self.length {
            let index = self.rng.gen_range(0 .. self.alphabet.len());
            payload.push(self.alphabet[index]);
        }
        payload
    }
}
