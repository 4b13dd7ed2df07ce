// crates/sangati-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Data Source
// Description: Read-only SQLite connections for Sangati assertions.
// Purpose: Resolve data-source indexes to local SQLite database files.
// Dependencies: sangati-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate implements [`sangati_core::DataSourceResolver`] over local
//! `SQLite` files. Databases are opened read-only for every resolve and
//! column values are bridged into [`sangati_core::TypedValue`] using the
//! storage class and the column's declared type.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use source::SqliteConnection;
pub use source::SqliteResolver;
pub use source::SqliteSource;
pub use source::SqliteSourceConfig;
pub use source::SqliteSourceError;
