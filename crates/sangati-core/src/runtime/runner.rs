// crates/sangati-core/src/runtime/runner.rs
// ============================================================================
// Module: Sangati Test Runner
// Description: Evaluate every test specification and aggregate a report.
// Purpose: Drive validation, dispatch, bounded concurrency, and reporting.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The runner validates each spec before touching any data source, dispatches
//! it to single- or dual-query evaluation, and records exactly one outcome per
//! spec. A failing spec never aborts the run.
//!
//! Evaluations may run on a bounded pool of scoped worker threads. Outcomes
//! land in index-addressed slots and are handed to the [`RunObserver`] as soon
//! as every earlier spec has finished, so observers always see declaration
//! order regardless of completion order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::core::outcome::ErrorCause;
use crate::core::outcome::FailureReason;
use crate::core::outcome::Report;
use crate::core::outcome::TestOutcome;
use crate::core::spec::TestSpec;
use crate::interfaces::CancelToken;
use crate::interfaces::DataSourceResolver;
use crate::interfaces::ExecutionError;
use crate::interfaces::NoopObserver;
use crate::interfaces::QueryLimits;
use crate::interfaces::RunObserver;
use crate::runtime::dual::evaluate_dual;
use crate::runtime::single::evaluate_single;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Upper bound on worker threads regardless of configuration.
pub const MAX_WORKERS: usize = 64;

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum number of specs evaluated concurrently.
    pub max_workers: usize,
    /// Timeout applied to each query individually.
    pub query_timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            query_timeout: None,
        }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Evaluates test specifications against a data-source resolver.
#[derive(Debug, Clone, Default)]
pub struct TestRunner {
    /// Runner configuration.
    config: RunnerConfig,
    /// Run-wide cancellation token.
    cancel: CancelToken,
}

impl TestRunner {
    /// Creates a runner with its own cancellation token.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Creates a runner sharing an externally owned cancellation token.
    #[must_use]
    pub const fn with_cancel(config: RunnerConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
        }
    }

    /// Returns the runner configuration.
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the cancellation token shared with in-flight queries.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Evaluates every spec and returns the report in declaration order.
    pub fn run<R>(&self, specs: &[TestSpec], resolver: &R, observer: &dyn RunObserver) -> Report
    where
        R: DataSourceResolver + ?Sized,
    {
        let workers = self.worker_count(specs.len(), resolver.max_concurrency());
        let report = if workers <= 1 {
            self.run_sequential(specs, resolver, observer)
        } else {
            self.run_parallel(specs, resolver, observer, workers)
        };
        observer.on_complete(&report);
        report
    }

    /// Evaluates one spec.
    #[must_use]
    pub fn evaluate<R>(&self, spec: &TestSpec, resolver: &R) -> TestOutcome
    where
        R: DataSourceResolver + ?Sized,
    {
        if self.cancel.is_cancelled() {
            return TestOutcome::errored(
                &spec.name,
                ErrorCause::Execution {
                    query: 0,
                    source: ExecutionError::Cancelled,
                },
            );
        }
        if let Err(error) = spec.validate() {
            return TestOutcome::failed(&spec.name, FailureReason::Validation(error));
        }
        let limits = QueryLimits::new(self.config.query_timeout, self.cancel.clone());
        if spec.queries.len() == 2 {
            evaluate_dual(spec, resolver, &limits)
        } else {
            evaluate_single(spec, resolver, &limits)
        }
    }

    /// Picks the effective worker count.
    fn worker_count(&self, specs: usize, source_limit: Option<usize>) -> usize {
        let configured = self.config.max_workers.clamp(1, MAX_WORKERS);
        let bounded = source_limit.map_or(configured, |limit| configured.min(limit.max(1)));
        bounded.min(specs)
    }

    /// Evaluates specs one at a time on the calling thread.
    fn run_sequential<R>(
        &self,
        specs: &[TestSpec],
        resolver: &R,
        observer: &dyn RunObserver,
    ) -> Report
    where
        R: DataSourceResolver + ?Sized,
    {
        let mut report = Report::new();
        for (index, spec) in specs.iter().enumerate() {
            let outcome = self.evaluate(spec, resolver);
            observer.on_outcome(index, &outcome);
            report.push(outcome);
        }
        report
    }

    /// Evaluates specs on `workers` scoped threads.
    fn run_parallel<R>(
        &self,
        specs: &[TestSpec],
        resolver: &R,
        observer: &dyn RunObserver,
        workers: usize,
    ) -> Report
    where
        R: DataSourceResolver + ?Sized,
    {
        let next = AtomicUsize::new(0);
        let slots = Mutex::new(OrderedSlots::new(specs.len()));

        thread::scope(|scope| {
            for _ in 0 .. workers {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(spec) = specs.get(index) else {
                            break;
                        };
                        let outcome = self.evaluate(spec, resolver);
                        slots
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .fill(index, outcome, observer);
                    }
                });
            }
        });

        slots.into_inner().unwrap_or_else(PoisonError::into_inner).into_report()
    }
}

/// Evaluates specs sequentially with no timeout and no observer.
pub fn run_tests<R>(specs: &[TestSpec], resolver: &R) -> Report
where
    R: DataSourceResolver + ?Sized,
{
    TestRunner::default().run(specs, resolver, &NoopObserver)
}

// ============================================================================
// SECTION: Ordered Slots
// ============================================================================

/// Index-addressed outcome slots with in-order observer flushing.
///
/// # Invariants
/// - `flushed` is the length of the contiguous filled prefix.
/// - Each slot is filled at most once.
struct OrderedSlots {
    /// Outcomes by spec index.
    slots: Vec<Option<TestOutcome>>,
    /// Number of leading outcomes already handed to the observer.
    flushed: usize,
}

impl OrderedSlots {
    /// Creates `len` empty slots.
    fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            flushed: 0,
        }
    }

    /// Stores an outcome and notifies the observer of every newly contiguous one.
    fn fill(&mut self, index: usize, outcome: TestOutcome, observer: &dyn RunObserver) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(outcome);
        }
        while let Some(Some(outcome)) = self.slots.get(self.flushed) {
            observer.on_outcome(self.flushed, outcome);
            self.flushed += 1;
        }
    }

    /// Collects filled slots into a report.
    fn into_report(self) -> Report {
        self.slots.into_iter().flatten().collect()
    }
}
