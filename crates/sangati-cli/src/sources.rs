// crates/sangati-cli/src/sources.rs
// ============================================================================
// Module: Data Source Registry
// Description: Routes data-source indexes to their configured backends.
// Purpose: Build one resolver over every database declared in the config.
// Dependencies: sangati-config, sangati-core, sangati-store-postgres, sangati-store-sqlite
// ============================================================================

//! ## Overview
//! The registry records which backend serves each configured index and
//! delegates to the Postgres and `SQLite` resolvers. Postgres pools are built
//! lazily and `SQLite` files are opened per resolve, so building the registry
//! never touches the network or the filesystem beyond path checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use sangati_config::DataSourceType;
use sangati_config::DatabaseConfig;
use sangati_config::SangatiConfig;
use sangati_core::Connection;
use sangati_core::DataSourceResolver;
use sangati_core::ExecutionError;
use sangati_store_postgres::CredentialSource;
use sangati_store_postgres::PostgresResolver;
use sangati_store_postgres::PostgresSourceConfig;
use sangati_store_sqlite::SqliteResolver;
use sangati_store_sqlite::SqliteSourceConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry construction errors.
#[derive(Debug, Error)]
pub(crate) enum RegistryError {
    /// A Postgres source could not be prepared.
    #[error("database {index}: {source}")]
    Postgres {
        /// Data-source index.
        index: u32,
        /// Underlying error.
        source: sangati_store_postgres::PostgresSourceError,
    },
    /// A `SQLite` source could not be prepared.
    #[error("database {index}: {source}")]
    Sqlite {
        /// Data-source index.
        index: u32,
        /// Underlying error.
        source: sangati_store_sqlite::SqliteSourceError,
    },
    /// A required field was absent after config validation.
    #[error("database {index}: missing {field}")]
    MissingField {
        /// Data-source index.
        index: u32,
        /// Field name.
        field: &'static str,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Resolver over every configured data source.
pub(crate) struct SourceRegistry {
    /// Backend type serving each index.
    routes: BTreeMap<u32, DataSourceType>,
    /// Postgres sources.
    postgres: PostgresResolver,
    /// `SQLite` sources.
    sqlite: SqliteResolver,
}

impl SourceRegistry {
    /// Registers every database in `config` with its backend resolver.
    pub(crate) fn from_config(
        config: &SangatiConfig,
        credentials: &CredentialSource,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self {
            routes: BTreeMap::new(),
            postgres: PostgresResolver::new(),
            sqlite: SqliteResolver::new(),
        };
        for database in &config.databases {
            registry.register(database, credentials)?;
        }
        Ok(registry)
    }

    /// Registers one database entry.
    fn register(
        &mut self,
        database: &DatabaseConfig,
        credentials: &CredentialSource,
    ) -> Result<(), RegistryError> {
        let index = database.index;
        match database.source_type {
            DataSourceType::Postgres => {
                let config = PostgresSourceConfig {
                    host: required(index, "host", database.host.as_deref())?,
                    port: database.port,
                    db_name: required(index, "db_name", database.db_name.as_deref())?,
                    max_connections: database.max_connections,
                    connect_timeout_ms: database.connect_timeout_ms,
                };
                self.postgres.insert(index, &config, credentials).map_err(|source| {
                    RegistryError::Postgres {
                        index,
                        source,
                    }
                })?;
            }
            DataSourceType::Sqlite => {
                let path = database.path.clone().ok_or(RegistryError::MissingField {
                    index,
                    field: "path",
                })?;
                let mut config = SqliteSourceConfig::new(path);
                config.busy_timeout_ms = database.connect_timeout_ms;
                self.sqlite.insert(index, config).map_err(|source| RegistryError::Sqlite {
                    index,
                    source,
                })?;
            }
        }
        self.routes.insert(index, database.source_type);
        Ok(())
    }
}

impl DataSourceResolver for SourceRegistry {
    fn resolve(&self, index: u32) -> Result<Box<dyn Connection + '_>, ExecutionError> {
        match self.routes.get(&index) {
            Some(DataSourceType::Postgres) => self.postgres.resolve(index),
            Some(DataSourceType::Sqlite) => self.sqlite.resolve(index),
            None => Err(ExecutionError::DataSourceNotFound(index)),
        }
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.postgres.max_concurrency()
    }
}

/// Unwraps a field that config validation guarantees.
fn required(index: u32, field: &'static str, value: Option<&str>) -> Result<String, RegistryError> {
    value.map(str::to_string).ok_or(RegistryError::MissingField {
        index,
        field,
    })
}
