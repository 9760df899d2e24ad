// crates/sdstress-config/src/lib.rs
// ============================================================================
// Module: sdstress Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for sdstress.toml semantics.
// Dependencies: sdstress-core, sdstress-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `sdstress-config` defines the configuration model for the harness. Files
//! are strict TOML with size and path limits; validation fails closed before
//! the store is touched.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
