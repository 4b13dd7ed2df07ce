// crates/sangati-config/src/lib.rs
// ============================================================================
// Module: Sangati Config Library
// Description: Canonical configuration model and loader.
// Purpose: Single source of truth for sangati.toml semantics.
// Dependencies: sangati-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! `sangati-config` defines the run configuration: runner settings, the
//! indexed data sources, and the declarative test specifications. Files are
//! read with strict size and path limits and validated before any database is
//! contacted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
