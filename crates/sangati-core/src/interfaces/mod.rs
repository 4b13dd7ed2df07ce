// crates/sangati-core/src/interfaces/mod.rs
// ============================================================================
// Module: Sangati Interfaces
// Description: Backend-agnostic interfaces for data sources and run observers.
// Purpose: Define the contract surfaces used by the Sangati runtime.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Sangati executes queries and reports progress without
//! embedding backend-specific details. Connections bridge their storage's
//! native types into [`TypedValue`]; the runtime never inspects raw driver
//! values. Implementations must honor the [`QueryContext`] deadline and
//! cancellation token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::core::outcome::Report;
use crate::core::outcome::TestOutcome;
use crate::core::value::TypedValue;

// ============================================================================
// SECTION: Query Context
// ============================================================================

/// Shared cancellation flag.
///
/// # Invariants
/// - Once cancelled, a token never resets.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Cancellation flag shared across clones.
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-query execution limits.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Instant after which the query must be abandoned.
    pub deadline: Option<Instant>,
    /// Run-wide cancellation token.
    pub cancel: CancelToken,
}

impl QueryContext {
    /// Creates a context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            deadline: timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
            cancel,
        }
    }

    /// Returns the time left before the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Checks cancellation and deadline before starting work.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Cancelled`] or [`ExecutionError::Timeout`].
    pub fn check(&self) -> Result<(), ExecutionError> {
        if self.cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        if self.remaining().is_some_and(|remaining| remaining.is_zero()) {
            return Err(ExecutionError::Timeout);
        }
        Ok(())
    }
}

/// Limits applied to every query a test issues.
///
/// # Invariants
/// - Each call to [`QueryLimits::start`] opens a fresh deadline, so one
///   query never spends another query's budget.
#[derive(Debug, Clone, Default)]
pub struct QueryLimits {
    /// Time allowed for each individual query.
    pub timeout: Option<Duration>,
    /// Run-wide cancellation token.
    pub cancel: CancelToken,
}

impl QueryLimits {
    /// Creates limits from a per-query timeout and a cancellation token.
    #[must_use]
    pub const fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            timeout,
            cancel,
        }
    }

    /// Starts the clock for one query.
    #[must_use]
    pub fn start(&self) -> QueryContext {
        QueryContext::with_timeout(self.timeout, self.cancel.clone())
    }
}

// ============================================================================
// SECTION: Data Sources
// ============================================================================

/// Query execution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// No data source is configured for the index.
    #[error("data source {0} not found")]
    DataSourceNotFound(u32),
    /// Connecting to the data source failed.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Query execution failed.
    #[error("query failed: {0}")]
    Query(String),
    /// A returned value could not be converted to a typed value.
    #[error("scan failed: {0}")]
    Scan(String),
    /// A single-row query returned no rows.
    #[error("query returned no rows")]
    NoRows,
    /// Returned column count differs from the declared type count.
    #[error("query returned {actual} columns, expected {expected}")]
    ColumnCount {
        /// Declared column count.
        expected: usize,
        /// Returned column count.
        actual: usize,
    },
    /// The query deadline elapsed.
    #[error("query timed out")]
    Timeout,
    /// The run was cancelled.
    #[error("query cancelled")]
    Cancelled,
}

/// Open connection to a data source.
pub trait Connection {
    /// Executes `query` and returns its first row.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NoRows`] when the query yields no rows,
    /// [`ExecutionError::ColumnCount`] when the row width differs from
    /// `column_count`, and other variants for execution or scan failures.
    fn fetch_one(
        &mut self,
        query: &str,
        column_count: usize,
        ctx: &QueryContext,
    ) -> Result<Vec<TypedValue>, ExecutionError>;

    /// Executes `query` and returns every row in fetch order.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when execution fails or any row fails to scan.
    fn fetch_all(
        &mut self,
        query: &str,
        column_count: usize,
        ctx: &QueryContext,
    ) -> Result<Vec<Vec<TypedValue>>, ExecutionError>;
}

/// Resolves data-source indexes into connections.
pub trait DataSourceResolver: Send + Sync {
    /// Opens a connection to the data source at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::DataSourceNotFound`] for unknown indexes and
    /// [`ExecutionError::Connection`] when a connection cannot be obtained.
    fn resolve(&self, index: u32) -> Result<Box<dyn Connection + '_>, ExecutionError>;

    /// Returns the number of concurrent evaluations the sources can absorb.
    fn max_concurrency(&self) -> Option<usize> {
        None
    }
}

/// Checks the width of a returned row.
///
/// # Errors
///
/// Returns [`ExecutionError::ColumnCount`] when widths differ.
pub const fn ensure_column_count(expected: usize, actual: usize) -> Result<(), ExecutionError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ExecutionError::ColumnCount {
            expected,
            actual,
        })
    }
}

// ============================================================================
// SECTION: Observers
// ============================================================================

/// Receives outcomes as a run progresses.
pub trait RunObserver: Sync {
    /// Called once per outcome, in declaration order.
    fn on_outcome(&self, index: usize, outcome: &TestOutcome);

    /// Called once with the finalized report.
    fn on_complete(&self, report: &Report);
}

/// Observer that discards every event.
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_outcome(&self, _index: usize, _outcome: &TestOutcome) {}

    fn on_complete(&self, _report: &Report) {}
}
