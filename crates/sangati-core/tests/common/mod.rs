// crates/sangati-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: In-memory data sources and spec builders for runtime tests.
// Purpose: Exercise evaluation without a database.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers may panic on misuse."
)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use sangati_core::Connection;
use sangati_core::DataSourceResolver;
use sangati_core::ExecutionError;
use sangati_core::OperatorName;
use sangati_core::QueryContext;
use sangati_core::QueryRef;
use sangati_core::Report;
use sangati_core::RunObserver;
use sangati_core::TestOutcome;
use sangati_core::TestSpec;
use sangati_core::TypeName;
use sangati_core::TypedValue;

/// Canned response for one query text.
type Canned = Result<Vec<Vec<TypedValue>>, ExecutionError>;

/// Resolver serving canned rows keyed by data-source index and query text.
#[derive(Default)]
pub struct StubResolver {
    responses: HashMap<(u32, String), Canned>,
    delays: HashMap<String, Duration>,
    concurrency: Option<usize>,
    resolves: AtomicUsize,
    fetches: AtomicUsize,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers rows for `query` on data source `index`.
    pub fn with_rows(mut self, index: u32, query: &str, rows: Vec<Vec<TypedValue>>) -> Self {
        self.responses.insert((index, query.to_string()), Ok(rows));
        self
    }

    /// Registers an execution error for `query` on data source `index`.
    pub fn with_error(mut self, index: u32, query: &str, error: ExecutionError) -> Self {
        self.responses.insert((index, query.to_string()), Err(error));
        self
    }

    /// Delays every fetch of `query`.
    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Advertises a concurrency limit.
    pub const fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    /// Returns the number of successful resolves.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Returns the number of fetch calls.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataSourceResolver for StubResolver {
    fn resolve(&self, index: u32) -> Result<Box<dyn Connection + '_>, ExecutionError> {
        if !self.responses.keys().any(|(known, _)| *known == index) {
            return Err(ExecutionError::DataSourceNotFound(index));
        }
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubConnection {
            resolver: self,
            index,
        }))
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.concurrency
    }
}

/// Connection bound to one stub data source.
struct StubConnection<'a> {
    resolver: &'a StubResolver,
    index: u32,
}

impl StubConnection<'_> {
    fn rows(&self, query: &str, ctx: &QueryContext) -> Canned {
        ctx.check()?;
        self.resolver.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolver.delays.get(query) {
            std::thread::sleep(*delay);
            ctx.check()?;
        }
        self.resolver
            .responses
            .get(&(self.index, query.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ExecutionError::Query(format!("unknown query: {query}"))))
    }
}

impl Connection for StubConnection<'_> {
    fn fetch_one(
        &mut self,
        query: &str,
        _column_count: usize,
        ctx: &QueryContext,
    ) -> Result<Vec<TypedValue>, ExecutionError> {
        self.rows(query, ctx)?.into_iter().next().ok_or(ExecutionError::NoRows)
    }

    fn fetch_all(
        &mut self,
        query: &str,
        _column_count: usize,
        ctx: &QueryContext,
    ) -> Result<Vec<Vec<TypedValue>>, ExecutionError> {
        self.rows(query, ctx)
    }
}

/// Observer recording every callback.
#[derive(Default)]
pub struct RecordingObserver {
    pub outcomes: Mutex<Vec<(usize, String)>>,
    pub completed: Mutex<Option<(usize, usize, usize)>>,
}

impl RunObserver for RecordingObserver {
    fn on_outcome(&self, index: usize, outcome: &TestOutcome) {
        self.outcomes.lock().unwrap().push((index, outcome.name.clone()));
    }

    fn on_complete(&self, report: &Report) {
        *self.completed.lock().unwrap() =
            Some((report.passed(), report.failed(), report.errored()));
    }
}

/// Builds a single-query spec.
pub fn single_spec(
    name: &str,
    types: &[&str],
    db_index: u32,
    query: &str,
    operator: &str,
    values: &[&str],
) -> TestSpec {
    TestSpec {
        name: name.to_string(),
        types: types.iter().copied().map(TypeName::from).collect(),
        queries: vec![QueryRef::new(db_index, query)],
        operator: OperatorName::from(operator),
        values: Some(values.iter().map(ToString::to_string).collect()),
    }
}

/// Builds a dual-query spec.
pub fn dual_spec(name: &str, types: &[&str], first: (u32, &str), second: (u32, &str)) -> TestSpec {
    TestSpec {
        name: name.to_string(),
        types: types.iter().copied().map(TypeName::from).collect(),
        queries: vec![QueryRef::new(first.0, first.1), QueryRef::new(second.0, second.1)],
        operator: OperatorName::default(),
        values: None,
    }
}

/// Shorthand for an integer value.
pub const fn int(value: i64) -> TypedValue {
    TypedValue::Int(value)
}

/// Shorthand for a string value.
pub fn text(value: &str) -> TypedValue {
    TypedValue::String(value.to_string())
}
