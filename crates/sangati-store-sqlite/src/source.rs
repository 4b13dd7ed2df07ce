// crates/sangati-store-sqlite/src/source.rs
// ============================================================================
// Module: SQLite Data Source
// Description: Read-only SQLite connections bridged into typed values.
// Purpose: Execute assertion queries against local SQLite databases.
// Dependencies: sangati-core, rusqlite, thiserror, time
// ============================================================================

//! ## Overview
//! Each resolve opens the database file read-only, so assertion queries can
//! never modify it. `SQLite` stores dates as text; columns declared `DATE`,
//! `TIMESTAMP` or `DATETIME` are parsed into date values, every other text
//! column is a string. Deadlines and cancellation are enforced through a
//! progress handler that interrupts the running statement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use rusqlite::OpenFlags;
use rusqlite::types::ValueRef;
use sangati_core::DataSourceResolver;
use sangati_core::ExecutionError;
use sangati_core::QueryContext;
use sangati_core::TypedValue;
use sangati_core::runtime::parse_date;
use sangati_core::runtime::parse_timestamp;
use thiserror::Error;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Virtual machine instructions between progress handler calls.
const PROGRESS_INTERVAL_OPS: i32 = 1_000;
/// Timestamp text without fractional seconds.
const TIMESTAMP_SECONDS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for one `SQLite` data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteSourceConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl SqliteSourceConfig {
    /// Creates a config with the default busy timeout.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` data-source setup errors.
#[derive(Debug, Error)]
pub enum SqliteSourceError {
    /// Invalid source configuration.
    #[error("sqlite source invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// A validated `SQLite` database file.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    /// Source configuration.
    config: SqliteSourceConfig,
}

impl SqliteSource {
    /// Validates the configuration without touching the file.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError::Invalid`] when the path breaks length limits
    /// or names a directory.
    pub fn new(config: SqliteSourceConfig) -> Result<Self, SqliteSourceError> {
        validate_source_path(&config.path)?;
        Ok(Self {
            config,
        })
    }

    /// Returns the source configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteSourceConfig {
        &self.config
    }

    /// Opens a read-only connection.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Connection`] when the file cannot be opened.
    pub fn open(&self) -> Result<SqliteConnection, ExecutionError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = rusqlite::Connection::open_with_flags(&self.config.path, flags)
            .map_err(|err| {
                ExecutionError::Connection(format!("{}: {err}", self.config.path.display()))
            })?;
        Ok(SqliteConnection {
            connection,
            busy_timeout: Duration::from_millis(self.config.busy_timeout_ms),
        })
    }
}

/// Resolver over a set of indexed `SQLite` sources.
#[derive(Debug, Clone, Default)]
pub struct SqliteResolver {
    /// Sources by data-source index.
    sources: BTreeMap<u32, SqliteSource>,
}

impl SqliteResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source under `index`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteSourceError`] when the config is invalid.
    pub fn insert(&mut self, index: u32, config: SqliteSourceConfig) -> Result<(), SqliteSourceError> {
        self.sources.insert(index, SqliteSource::new(config)?);
        Ok(())
    }
}

impl DataSourceResolver for SqliteResolver {
    fn resolve(&self, index: u32) -> Result<Box<dyn sangati_core::Connection + '_>, ExecutionError> {
        let source = self.sources.get(&index).ok_or(ExecutionError::DataSourceNotFound(index))?;
        Ok(Box::new(source.open()?))
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Open read-only `SQLite` connection.
pub struct SqliteConnection {
    /// Underlying connection.
    connection: rusqlite::Connection,
    /// Configured busy timeout.
    busy_timeout: Duration,
}

impl SqliteConnection {
    /// Runs `query` and scans at most `limit` rows.
    fn query_rows(
        &self,
        query: &str,
        column_count: usize,
        limit: Option<usize>,
        ctx: &QueryContext,
    ) -> Result<Vec<Vec<TypedValue>>, ExecutionError> {
        ctx.check()?;
        self.arm(ctx)?;
        let result = self.scan(query, column_count, limit);
        let disarmed = self.disarm();
        let rows = result.map_err(|err| match err {
            ScanFailure::Sqlite(error) if is_interrupt(&error) => interruption(ctx, &error),
            ScanFailure::Sqlite(error) => ExecutionError::Query(error.to_string()),
            ScanFailure::Execution(error) => error,
        })?;
        disarmed?;
        Ok(rows)
    }

    /// Installs the busy timeout and the interrupting progress handler.
    fn arm(&self, ctx: &QueryContext) -> Result<(), ExecutionError> {
        let busy = ctx.remaining().map_or(self.busy_timeout, |left| left.min(self.busy_timeout));
        self.connection
            .busy_timeout(busy)
            .map_err(|err| ExecutionError::Connection(err.to_string()))?;
        let deadline = ctx.deadline;
        let cancel = ctx.cancel.clone();
        self.connection
            .progress_handler(
                PROGRESS_INTERVAL_OPS,
                Some(move || {
                    cancel.is_cancelled()
                        || deadline.is_some_and(|deadline| Instant::now() >= deadline)
                }),
            )
            .map_err(|err| ExecutionError::Connection(err.to_string()))
    }

    /// Removes the progress handler so a stale deadline cannot interrupt a
    /// later query on this connection.
    fn disarm(&self) -> Result<(), ExecutionError> {
        self.connection
            .progress_handler(0, None::<fn() -> bool>)
            .map_err(|err| ExecutionError::Connection(err.to_string()))
    }

    /// Prepares, executes, and converts rows.
    fn scan(
        &self,
        query: &str,
        column_count: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Vec<TypedValue>>, ScanFailure> {
        let mut statement = self.connection.prepare(query)?;
        let actual = statement.column_count();
        if actual != column_count {
            return Err(ScanFailure::Execution(ExecutionError::ColumnCount {
                expected: column_count,
                actual,
            }));
        }
        let declared: Vec<Option<String>> = statement
            .columns()
            .iter()
            .map(|column| column.decl_type().map(str::to_ascii_uppercase))
            .collect();

        let mut rows = statement.query([])?;
        let mut scanned = Vec::new();
        while limit.is_none_or(|limit| scanned.len() < limit) {
            let Some(row) = rows.next()? else {
                break;
            };
            let mut values = Vec::with_capacity(column_count);
            for (index, declared) in declared.iter().enumerate() {
                let value = bridge_value(row.get_ref(index)?, declared.as_deref())
                    .map_err(|message| {
                        ScanFailure::Execution(ExecutionError::Scan(format!(
                            "column {index}: {message}"
                        )))
                    })?;
                values.push(value);
            }
            scanned.push(values);
        }
        Ok(scanned)
    }
}

impl sangati_core::Connection for SqliteConnection {
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

/// Failure while scanning, before it is mapped against the query context.
enum ScanFailure {
    /// Engine error.
    Sqlite(rusqlite::Error),
    /// Already classified failure.
    Execution(ExecutionError),
}

impl From<rusqlite::Error> for ScanFailure {
    fn from(error: rusqlite::Error) -> Self {
        Self::Sqlite(error)
    }
}

/// Returns true when the statement was interrupted by the progress handler.
fn is_interrupt(error: &rusqlite::Error) -> bool {
    error.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted)
}

/// Classifies an interruption as cancellation or timeout.
fn interruption(ctx: &QueryContext, error: &rusqlite::Error) -> ExecutionError {
    if ctx.cancel.is_cancelled() {
        ExecutionError::Cancelled
    } else if ctx.remaining().is_some_and(|left| left.is_zero()) {
        ExecutionError::Timeout
    } else {
        ExecutionError::Query(error.to_string())
    }
}

/// Converts one column value using its storage class and declared type.
fn bridge_value(value: ValueRef<'_>, declared: Option<&str>) -> Result<TypedValue, String> {
    match value {
        ValueRef::Null => Ok(TypedValue::Null),
        ValueRef::Integer(value) => Ok(TypedValue::Int(value)),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| "text value is not valid utf-8".to_string())?;
            bridge_text(text, declared)
        }
        ValueRef::Real(_) => Err("REAL values are not supported".to_string()),
        ValueRef::Blob(_) => Err("BLOB values are not supported".to_string()),
    }
}

/// Parses text columns declared as dates or timestamps.
fn bridge_text(text: &str, declared: Option<&str>) -> Result<TypedValue, String> {
    match declared {
        Some("DATE") => parse_date(text).map(TypedValue::Date).map_err(|err| err.to_string()),
        Some("TIMESTAMP" | "DATETIME") => parse_timestamp(text)
            .or_else(|_| PrimitiveDateTime::parse(text, TIMESTAMP_SECONDS_FORMAT))
            .map(TypedValue::Timestamp)
            .map_err(|_| format!("'{text}' is not a timestamp")),
        _ => Ok(TypedValue::String(text.to_string())),
    }
}

/// Validates source paths for safety limits.
fn validate_source_path(path: &Path) -> Result<(), SqliteSourceError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteSourceError::Invalid("source path must be non-empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteSourceError::Invalid("source path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteSourceError::Invalid(
            "source path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteSourceError::Invalid(
            "source path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
