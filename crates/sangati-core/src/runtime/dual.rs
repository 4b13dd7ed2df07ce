// crates/sangati-core/src/runtime/dual.rs
// ============================================================================
// Module: Sangati Dual-Query Evaluation
// Description: Compare two complete result sets for structural equality.
// Purpose: Evaluate query-vs-query test specifications.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Both queries run against their own data sources and are fetched in full.
//! Rows are compared in fetch order with plain value equality; the declared
//! operator is ignored. Result sets holding the same rows in a different
//! order are reported as mismatched, so queries should impose an explicit
//! `ORDER BY`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::outcome::ErrorCause;
use crate::core::outcome::FailureReason;
use crate::core::outcome::TestOutcome;
use crate::core::spec::QueryRef;
use crate::core::spec::TestSpec;
use crate::core::spec::ValidationError;
use crate::core::value::TypedValue;
use crate::interfaces::DataSourceResolver;
use crate::interfaces::ExecutionError;
use crate::interfaces::QueryLimits;
use crate::interfaces::ensure_column_count;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a validated dual-query spec.
///
/// Each query gets its own deadline; the second query does not inherit the
/// time spent on the first.
#[must_use]
pub fn evaluate_dual<R>(spec: &TestSpec, resolver: &R, limits: &QueryLimits) -> TestOutcome
where
    R: DataSourceResolver + ?Sized,
{
    let [first_query, second_query] = spec.queries.as_slice() else {
        return TestOutcome::failed(
            &spec.name,
            FailureReason::Validation(ValidationError::InvalidQueryCount(spec.queries.len())),
        );
    };
    let column_count = spec.column_count();

    let first = match fetch_rows(resolver, first_query, column_count, limits) {
        Ok(rows) => rows,
        Err(source) => {
            return TestOutcome::errored(
                &spec.name,
                ErrorCause::Execution {
                    query: 0,
                    source,
                },
            );
        }
    };
    let second = match fetch_rows(resolver, second_query, column_count, limits) {
        Ok(rows) => rows,
        Err(source) => {
            return TestOutcome::errored(
                &spec.name,
                ErrorCause::Execution {
                    query: 1,
                    source,
                },
            );
        }
    };

    if first.len() != second.len() {
        return TestOutcome::failed(
            &spec.name,
            FailureReason::RowCountMismatch {
                first: first.len(),
                second: second.len(),
            },
        );
    }

    for (row, (left, right)) in first.iter().zip(&second).enumerate() {
        if let Some(column) = left.iter().zip(right).position(|(left, right)| left != right) {
            return TestOutcome::failed(
                &spec.name,
                FailureReason::RowMismatch {
                    row,
                    column,
                    first: left[column].clone(),
                    second: right[column].clone(),
                },
            );
        }
    }

    TestOutcome::passed(&spec.name, format!("{} rows matched", first.len()))
}

/// Resolves a data source, fetches every row under a fresh deadline, and
/// releases the connection.
fn fetch_rows<R>(
    resolver: &R,
    query: &QueryRef,
    column_count: usize,
    limits: &QueryLimits,
) -> Result<Vec<Vec<TypedValue>>, ExecutionError>
where
    R: DataSourceResolver + ?Sized,
{
    let mut connection = resolver.resolve(query.db_index)?;
    let rows = connection.fetch_all(&query.query, column_count, &limits.start())?;
    for row in &rows {
        ensure_column_count(column_count, row.len())?;
    }
    Ok(rows)
}
