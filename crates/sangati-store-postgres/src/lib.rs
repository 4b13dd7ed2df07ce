// crates/sangati-store-postgres/src/lib.rs
// ============================================================================
// Module: Postgres Data Source
// Description: Pooled PostgreSQL connections for Sangati assertions.
// Purpose: Resolve data-source indexes to PostgreSQL servers.
// Dependencies: sangati-core, postgres, r2d2, r2d2_postgres
// ============================================================================

//! ## Overview
//! This crate implements [`sangati_core::DataSourceResolver`] over
//! `PostgreSQL`. Each data source owns a lazily connected `r2d2` pool, so an
//! unreachable server fails only the tests that query it. Credentials come
//! from the environment and never appear in configuration files.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::CredentialSource;
pub use credentials::Credentials;
pub use source::PostgresConnection;
pub use source::PostgresResolver;
pub use source::PostgresSource;
pub use source::PostgresSourceConfig;
pub use source::PostgresSourceError;
