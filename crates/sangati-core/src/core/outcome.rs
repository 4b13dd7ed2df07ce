// crates/sangati-core/src/core/outcome.rs
// ============================================================================
// Module: Sangati Test Outcomes
// Description: Per-test outcomes and the aggregated run report.
// Purpose: Record a definite status for every evaluated test specification.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! Every test specification yields exactly one [`TestOutcome`]: `Passed`,
//! `Failed` (the assertion or the spec itself is wrong) or `Errored` (the test
//! could not be carried out). Outcomes are immutable once created and are
//! collected into a [`Report`] in declaration order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::spec::ValidationError;
use crate::core::value::Operator;
use crate::core::value::TypedValue;
use crate::interfaces::ExecutionError;
use crate::runtime::coerce::CoercionError;
use crate::runtime::comparator::CompareError;

// ============================================================================
// SECTION: Failure Reasons
// ============================================================================

/// Why a test failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// The test specification is malformed.
    #[error("invalid test structure: {0}")]
    Validation(ValidationError),
    /// A returned column does not satisfy the expected literal.
    #[error("column {column}: expected {operator} {expected}, returned {returned}")]
    ColumnMismatch {
        /// Column position.
        column: usize,
        /// Operator applied as `returned <operator> expected`.
        operator: Operator,
        /// Coerced expected value.
        expected: TypedValue,
        /// Value returned by the query.
        returned: TypedValue,
    },
    /// The two queries returned a different number of rows.
    #[error("row count mismatch: first query returned {first} rows, second returned {second}")]
    RowCountMismatch {
        /// Rows returned by the first query.
        first: usize,
        /// Rows returned by the second query.
        second: usize,
    },
    /// The two result sets differ at a row and column.
    #[error("row {row}, column {column}: first query returned {first}, second returned {second}")]
    RowMismatch {
        /// Row position in fetch order.
        row: usize,
        /// Column position.
        column: usize,
        /// Value from the first query.
        first: TypedValue,
        /// Value from the second query.
        second: TypedValue,
    },
}

// ============================================================================
// SECTION: Error Causes
// ============================================================================

/// Why a test could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorCause {
    /// A query could not be resolved, executed, or scanned.
    #[error("query {query} failed: {source}")]
    Execution {
        /// Query position within the spec.
        query: usize,
        /// Execution failure.
        source: ExecutionError,
    },
    /// The declared operator is not supported.
    #[error("{0}")]
    Operator(CompareError),
    /// An expected literal failed to coerce at evaluation time.
    #[error("value at column {column} is invalid: {source}")]
    ValueCoercion {
        /// Column position.
        column: usize,
        /// Coercion failure.
        source: CoercionError,
    },
    /// The comparison itself could not be evaluated.
    #[error("column {column}: {source}")]
    Comparison {
        /// Column position.
        column: usize,
        /// Comparison failure.
        source: CompareError,
    },
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Status of one evaluated test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Assertion held.
    Passed,
    /// Assertion did not hold or the spec is invalid.
    Failed(FailureReason),
    /// Test could not be carried out.
    Errored(ErrorCause),
}

impl OutcomeStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
            Self::Errored(_) => "errored",
        }
    }
}

/// Result of evaluating one test specification.
///
/// # Invariants
/// - Created once per spec and never mutated afterwards.
/// - `detail` is the rendered reason for failed and errored outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Test name.
    pub name: String,
    /// Outcome status.
    pub status: OutcomeStatus,
    /// Human-readable detail.
    pub detail: String,
}

impl TestOutcome {
    /// Creates a passed outcome.
    #[must_use]
    pub fn passed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: OutcomeStatus::Passed,
            detail: detail.into(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(name: impl Into<String>, reason: FailureReason) -> Self {
        let detail = reason.to_string();
        Self {
            name: name.into(),
            status: OutcomeStatus::Failed(reason),
            detail,
        }
    }

    /// Creates an errored outcome.
    #[must_use]
    pub fn errored(name: impl Into<String>, cause: ErrorCause) -> Self {
        let detail = cause.to_string();
        Self {
            name: name.into(),
            status: OutcomeStatus::Errored(cause),
            detail,
        }
    }

    /// Returns true when the test passed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Passed)
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Ordered outcomes plus summary counts.
///
/// # Invariants
/// - `outcomes` is in test declaration order.
/// - `passed + failed + errored == outcomes.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Outcomes in declaration order.
    outcomes: Vec<TestOutcome>,
    /// Number of passed tests.
    passed: usize,
    /// Number of failed tests.
    failed: usize,
    /// Number of errored tests.
    errored: usize,
}

impl Report {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            passed: 0,
            failed: 0,
            errored: 0,
        }
    }

    /// Appends the next outcome in declaration order.
    pub fn push(&mut self, outcome: TestOutcome) {
        match outcome.status {
            OutcomeStatus::Passed => self.passed += 1,
            OutcomeStatus::Failed(_) => self.failed += 1,
            OutcomeStatus::Errored(_) => self.errored += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Returns the outcomes in declaration order.
    #[must_use]
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    /// Returns the number of passed tests.
    #[must_use]
    pub const fn passed(&self) -> usize {
        self.passed
    }

    /// Returns the number of failed tests, excluding errored ones.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Returns the number of errored tests.
    #[must_use]
    pub const fn errored(&self) -> usize {
        self.errored
    }

    /// Returns the number of tests that did not pass.
    #[must_use]
    pub const fn failed_total(&self) -> usize {
        self.failed + self.errored
    }

    /// Returns true when every test passed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed_total() == 0
    }
}

impl FromIterator<TestOutcome> for Report {
    fn from_iter<I: IntoIterator<Item = TestOutcome>>(iter: I) -> Self {
        let mut report = Self::new();
        for outcome in iter {
            report.push(outcome);
        }
        report
    }
}
