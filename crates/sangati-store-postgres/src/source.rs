// crates/sangati-store-postgres/src/source.rs
// ============================================================================
// Module: Postgres Data Source
// Description: Pooled PostgreSQL connections bridged into typed values.
// Purpose: Execute assertion queries against PostgreSQL servers.
// Dependencies: sangati-core, postgres, r2d2, r2d2_postgres, time
// ============================================================================

//! ## Overview
//! Every query runs inside a read-only transaction that is rolled back once
//! the rows are scanned. When the query context carries a deadline the
//! remaining time is applied with `SET LOCAL statement_timeout`, and a
//! server-side cancellation is reported as a timeout.
//!
//! Pools are built without connecting. The first query against a data source
//! opens its first connection, so an unreachable server only errors the tests
//! that use it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::iter;
use std::time::Duration;

use postgres::NoTls;
use postgres::Row;
use postgres::fallible_iterator::FallibleIterator;
use postgres::error::SqlState;
use postgres::types::Type;
use r2d2::Pool;
use r2d2::PooledConnection;
use r2d2_postgres::PostgresConnectionManager;
use sangati_core::DataSourceResolver;
use sangati_core::ExecutionError;
use sangati_core::QueryContext;
use sangati_core::TypedValue;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;

use crate::credentials::CredentialSource;
use crate::credentials::Credentials;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Application name reported to the server.
const APPLICATION_NAME: &str = "sangati";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Connection settings for one `PostgreSQL` data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSourceConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub db_name: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl PostgresSourceConfig {
    /// Builds driver settings without touching the network.
    #[must_use]
    pub fn driver_config(&self, credentials: &Credentials) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.db_name)
            .user(&credentials.user)
            .application_name(APPLICATION_NAME)
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms));
        if let Some(password) = &credentials.password {
            config.password(password);
        }
        config
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `PostgreSQL` data-source setup errors.
#[derive(Debug, Error)]
pub enum PostgresSourceError {
    /// No credentials are available for the data source.
    #[error("postgres source missing credentials: {0}")]
    MissingCredentials(String),
    /// Invalid source configuration.
    #[error("postgres source invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// A lazily connected `PostgreSQL` pool.
pub struct PostgresSource {
    /// Connection pool.
    pool: Pool<PostgresConnectionManager<NoTls>>,
    /// Pool size.
    max_connections: u32,
}

impl PostgresSource {
    /// Builds the pool without opening any connection.
    ///
    /// # Errors
    ///
    /// Returns [`PostgresSourceError::Invalid`] for a zero pool size.
    pub fn new(
        config: &PostgresSourceConfig,
        credentials: &Credentials,
    ) -> Result<Self, PostgresSourceError> {
        if config.max_connections == 0 {
            return Err(PostgresSourceError::Invalid(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        let manager = PostgresConnectionManager::new(config.driver_config(credentials), NoTls);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build_unchecked(manager);
        Ok(Self {
            pool,
            max_connections: config.max_connections,
        })
    }

    /// Returns the pool size.
    #[must_use]
    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Checks out a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Connection`] when no connection can be
    /// established within the connect timeout.
    pub fn open(&self) -> Result<PostgresConnection, ExecutionError> {
        let client =
            self.pool.get().map_err(|err| ExecutionError::Connection(err.to_string()))?;
        Ok(PostgresConnection {
            client,
        })
    }
}

/// Resolver over a set of indexed `PostgreSQL` sources.
#[derive(Default)]
pub struct PostgresResolver {
    /// Sources by data-source index.
    sources: BTreeMap<u32, PostgresSource>,
}

impl PostgresResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source under `index`, resolving its credentials.
    ///
    /// # Errors
    ///
    /// Returns [`PostgresSourceError`] when credentials are missing or the
    /// config is invalid.
    pub fn insert(
        &mut self,
        index: u32,
        config: &PostgresSourceConfig,
        credentials: &CredentialSource,
    ) -> Result<(), PostgresSourceError> {
        let credentials = credentials.credentials(index)?;
        self.sources.insert(index, PostgresSource::new(config, &credentials)?);
        Ok(())
    }
}

impl DataSourceResolver for PostgresResolver {
    fn resolve(&self, index: u32) -> Result<Box<dyn sangati_core::Connection + '_>, ExecutionError> {
        let source = self.sources.get(&index).ok_or(ExecutionError::DataSourceNotFound(index))?;
        Ok(Box::new(source.open()?))
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.sources
            .values()
            .map(|source| usize::try_from(source.max_connections).unwrap_or(usize::MAX))
            .min()
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Pooled `PostgreSQL` connection, returned to its pool on drop.
pub struct PostgresConnection {
    /// Checked-out client.
    client: PooledConnection<PostgresConnectionManager<NoTls>>,
}

impl PostgresConnection {
    /// Runs `query` in a read-only transaction and scans at most `limit` rows.
    fn query_rows(
        &mut self,
        query: &str,
        column_count: usize,
        limit: Option<usize>,
        ctx: &QueryContext,
    ) -> Result<Vec<Vec<TypedValue>>, ExecutionError> {
        ctx.check()?;
        let classify = |err: postgres::Error| classify_error(&err, ctx);
        let mut transaction = self.client.transaction().map_err(classify)?;
        transaction.batch_execute("SET TRANSACTION READ ONLY").map_err(classify)?;
        if let Some(remaining) = ctx.remaining() {
            transaction
                .batch_execute(&statement_timeout_sql(remaining))
                .map_err(classify)?;
        }
        let statement = transaction.prepare(query).map_err(classify)?;
        let actual = statement.columns().len();
        if actual != column_count {
            return Err(ExecutionError::ColumnCount {
                expected: column_count,
                actual,
            });
        }
        let rows = transaction.query_raw(&statement, iter::empty::<i32>()).map_err(classify)?;
        let scanned = scan_rows(rows, limit, ctx, |row| bridge_row(&row))?;
        transaction.rollback().map_err(classify)?;
        Ok(scanned)
    }
}

/// Pulls rows until `limit` rows are scanned or the result set ends.
fn scan_rows<I, T>(
    mut rows: I,
    limit: Option<usize>,
    ctx: &QueryContext,
    mut scan: impl FnMut(I::Item) -> Result<T, ExecutionError>,
) -> Result<Vec<T>, ExecutionError>
where
    I: FallibleIterator<Error = postgres::Error>,
{
    let mut scanned = Vec::new();
    while limit.is_none_or(|limit| scanned.len() < limit) {
        let Some(row) = rows.next().map_err(|err| classify_error(&err, ctx))? else {
            break;
        };
        scanned.push(scan(row)?);
    }
    Ok(scanned)
}

impl sangati_core::Connection for PostgresConnection {
    fn fetch_one(
        &mut self,
        query: &str,
        column_count: usize,
        ctx: &QueryContext,
    ) -> Result<Vec<TypedValue>, ExecutionError> {
        self.query_rows(query, column_count, Some(1), ctx)?
            .into_iter()
            .next()
            .ok_or(ExecutionError::NoRows)
    }

    fn fetch_all(
        &mut self,
        query: &str,
        column_count: usize,
        ctx: &QueryContext,
    ) -> Result<Vec<Vec<TypedValue>>, ExecutionError> {
        self.query_rows(query, column_count, None, ctx)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders the per-transaction statement timeout, never below one millisecond.
fn statement_timeout_sql(remaining: Duration) -> String {
    let millis = remaining.as_millis().max(1);
    format!("SET LOCAL statement_timeout = {millis}")
}

/// Maps driver errors, treating server-side cancellation as timeout.
fn classify_error(err: &postgres::Error, ctx: &QueryContext) -> ExecutionError {
    if err.code() == Some(&SqlState::QUERY_CANCELED) {
        if ctx.cancel.is_cancelled() {
            return ExecutionError::Cancelled;
        }
        return ExecutionError::Timeout;
    }
    if err.is_closed() {
        return ExecutionError::Connection(err.to_string());
    }
    ExecutionError::Query(err.to_string())
}

/// Converts every column of a row.
fn bridge_row(row: &Row) -> Result<Vec<TypedValue>, ExecutionError> {
    (0 .. row.len())
        .map(|index| {
            bridge_column(row, index).map_err(|message| {
                ExecutionError::Scan(format!("column {index}: {message}"))
            })
        })
        .collect()
}

/// Converts one column using its server-reported type.
fn bridge_column(row: &Row, index: usize) -> Result<TypedValue, String> {
    let column_type = row.columns()[index].type_().clone();
    let family = TypeFamily::of(&column_type)
        .ok_or_else(|| format!("unsupported column type {}", column_type.name()))?;
    let value = match family {
        TypeFamily::SmallInt => get::<i16>(row, index)?.map(|value| TypedValue::Int(value.into())),
        TypeFamily::Integer => get::<i32>(row, index)?.map(|value| TypedValue::Int(value.into())),
        TypeFamily::BigInt => get::<i64>(row, index)?.map(TypedValue::Int),
        TypeFamily::Text => get::<String>(row, index)?.map(TypedValue::String),
        TypeFamily::Date => get::<Date>(row, index)?.map(TypedValue::Date),
        TypeFamily::Timestamp => get::<PrimitiveDateTime>(row, index)?.map(TypedValue::Timestamp),
        TypeFamily::TimestampTz => get::<OffsetDateTime>(row, index)?.map(|value| {
            let utc = value.to_offset(UtcOffset::UTC);
            TypedValue::Timestamp(PrimitiveDateTime::new(utc.date(), utc.time()))
        }),
    };
    Ok(value.unwrap_or(TypedValue::Null))
}

/// Reads a nullable column.
fn get<'a, T>(row: &'a Row, index: usize) -> Result<Option<T>, String>
where
    T: postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(index).map_err(|err| err.to_string())
}

/// Server types grouped by the typed value they bridge to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeFamily {
    /// `int2`.
    SmallInt,
    /// `int4`.
    Integer,
    /// `int8`.
    BigInt,
    /// `text`, `varchar`, `bpchar`, `name`.
    Text,
    /// `date`.
    Date,
    /// `timestamp`.
    Timestamp,
    /// `timestamptz`, normalized to UTC.
    TimestampTz,
}

impl TypeFamily {
    /// Classifies a server type.
    fn of(column_type: &Type) -> Option<Self> {
        let family = if *column_type == Type::INT2 {
            Self::SmallInt
        } else if *column_type == Type::INT4 {
            Self::Integer
        } else if *column_type == Type::INT8 {
            Self::BigInt
        } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(column_type) {
            Self::Text
        } else if *column_type == Type::DATE {
            Self::Date
        } else if *column_type == Type::TIMESTAMP {
            Self::Timestamp
        } else if *column_type == Type::TIMESTAMPTZ {
            Self::TimestampTz
        } else {
            return None;
        };
        Some(family)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use std::cell::Cell;

    use postgres::fallible_iterator;

    use super::*;

    fn config() -> PostgresSourceConfig {
        PostgresSourceConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            db_name: "warehouse".to_string(),
            max_connections: 2,
            connect_timeout_ms: 200,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            user: "reporting".to_string(),
            password: Some("secret".to_string()),
        }
    }

    #[test]
    fn driver_config_carries_every_setting() {
        let driver = config().driver_config(&credentials());
        assert_eq!(driver.get_user(), Some("reporting"));
        assert_eq!(driver.get_password(), Some(&b"secret"[..]));
        assert_eq!(driver.get_dbname(), Some("warehouse"));
        assert_eq!(driver.get_ports(), &[1]);
        assert_eq!(driver.get_application_name(), Some(APPLICATION_NAME));
        assert_eq!(driver.get_connect_timeout(), Some(&Duration::from_millis(200)));
    }

    #[test]
    fn driver_config_omits_missing_password() {
        let credentials = Credentials {
            user: "reporting".to_string(),
            password: None,
        };
        assert_eq!(config().driver_config(&credentials).get_password(), None);
    }

    #[test]
    fn type_families_cover_supported_types() {
        assert_eq!(TypeFamily::of(&Type::INT2), Some(TypeFamily::SmallInt));
        assert_eq!(TypeFamily::of(&Type::INT8), Some(TypeFamily::BigInt));
        assert_eq!(TypeFamily::of(&Type::BPCHAR), Some(TypeFamily::Text));
        assert_eq!(TypeFamily::of(&Type::NAME), Some(TypeFamily::Text));
        assert_eq!(TypeFamily::of(&Type::TIMESTAMPTZ), Some(TypeFamily::TimestampTz));
        assert_eq!(TypeFamily::of(&Type::FLOAT8), None);
        assert_eq!(TypeFamily::of(&Type::NUMERIC), None);
        assert_eq!(TypeFamily::of(&Type::BOOL), None);
    }

    #[test]
    fn statement_timeout_never_drops_to_zero() {
        assert_eq!(statement_timeout_sql(Duration::ZERO), "SET LOCAL statement_timeout = 1");
        assert_eq!(
            statement_timeout_sql(Duration::from_millis(1500)),
            "SET LOCAL statement_timeout = 1500"
        );
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut invalid = config();
        invalid.max_connections = 0;
        assert!(PostgresSource::new(&invalid, &credentials()).is_err());
    }

    #[test]
    fn resolver_reports_unknown_indexes_and_pool_limits() {
        let mut resolver = PostgresResolver::new();
        assert_eq!(resolver.max_concurrency(), None);
        let overrides = BTreeMap::from([("DBUSER".to_string(), "app".to_string())]);
        let credentials = CredentialSource::with_overrides(overrides);
        resolver.insert(0, &config(), &credentials).unwrap();
        let mut larger = config();
        larger.max_connections = 8;
        resolver.insert(1, &larger, &credentials).unwrap();
        assert_eq!(resolver.max_concurrency(), Some(2));
        assert!(matches!(resolver.resolve(4), Err(ExecutionError::DataSourceNotFound(4))));
    }

    #[test]
    fn missing_credentials_fail_registration() {
        let mut resolver = PostgresResolver::new();
        let credentials = CredentialSource::with_overrides(BTreeMap::new());
        let err = resolver.insert(0, &config(), &credentials).err().unwrap();
        assert!(matches!(err, PostgresSourceError::MissingCredentials(_)));
    }

    #[test]
    fn row_scan_stops_pulling_at_the_limit() {
        let pulled = Cell::new(0_usize);
        let rows = fallible_iterator::convert(
            (1 ..= 5).inspect(|_| pulled.set(pulled.get() + 1)).map(Ok::<i64, postgres::Error>),
        );
        let scanned =
            scan_rows(rows, Some(1), &QueryContext::default(), |row| Ok(TypedValue::Int(row)))
                .unwrap();
        assert_eq!(scanned, vec![TypedValue::Int(1)]);
        assert_eq!(pulled.get(), 1);
    }

    #[test]
    fn row_scan_without_limit_drains_every_row() {
        let rows = fallible_iterator::convert((1 ..= 3).map(Ok::<i64, postgres::Error>));
        let scanned =
            scan_rows(rows, None, &QueryContext::default(), |row| Ok(TypedValue::Int(row)))
                .unwrap();
        assert_eq!(scanned, vec![TypedValue::Int(1), TypedValue::Int(2), TypedValue::Int(3)]);
    }

    #[test]
    fn row_scan_propagates_scan_failures() {
        let rows = fallible_iterator::convert((1 ..= 3).map(Ok::<i64, postgres::Error>));
        let err = scan_rows(rows, None, &QueryContext::default(), |row| {
            if row == 2 {
                Err(ExecutionError::Scan("unsupported".to_string()))
            } else {
                Ok(TypedValue::Int(row))
            }
        })
        .unwrap_err();
        assert_eq!(err, ExecutionError::Scan("unsupported".to_string()));
    }

    #[test]
    fn unreachable_server_is_a_connection_error() {
        let source = PostgresSource::new(&config(), &credentials()).unwrap();
        assert!(matches!(source.open(), Err(ExecutionError::Connection(_))));
    }
}
