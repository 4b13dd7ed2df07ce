// crates/sangati-core/src/runtime/single.rs
// ============================================================================
// Module: Sangati Single-Query Evaluation
// Description: Compare one returned row against literal expected values.
// Purpose: Evaluate single-query test specifications.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The query's first row is compared column by column against the coerced
//! expected literals as `returned <operator> expected`. Evaluation stops at the
//! first column that does not hold; later columns are not compared, so only
//! that column is reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::outcome::ErrorCause;
use crate::core::outcome::FailureReason;
use crate::core::outcome::TestOutcome;
use crate::core::spec::TestSpec;
use crate::core::spec::ValidationError;
use crate::interfaces::DataSourceResolver;
use crate::interfaces::QueryLimits;
use crate::interfaces::ensure_column_count;
use crate::runtime::coerce::coerce;
use crate::runtime::comparator::compare;
use crate::runtime::comparator::resolve_operator;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a validated single-query spec.
///
/// The query deadline starts once its connection has been acquired.
#[must_use]
pub fn evaluate_single<R>(spec: &TestSpec, resolver: &R, limits: &QueryLimits) -> TestOutcome
where
    R: DataSourceResolver + ?Sized,
{
    let Some(query) = spec.queries.first() else {
        return TestOutcome::failed(
            &spec.name,
            FailureReason::Validation(ValidationError::InvalidQueryCount(0)),
        );
    };
    let tags = match spec.resolved_tags() {
        Ok(tags) => tags,
        Err(error) => return TestOutcome::failed(&spec.name, FailureReason::Validation(error)),
    };
    let Some(expected) = spec.expected_values() else {
        return TestOutcome::failed(
            &spec.name,
            FailureReason::Validation(ValidationError::MissingExpectedValues),
        );
    };
    let operator = match resolve_operator(&spec.operator) {
        Ok(operator) => operator,
        Err(error) => return TestOutcome::errored(&spec.name, ErrorCause::Operator(error)),
    };

    let row = resolver
        .resolve(query.db_index)
        .and_then(|mut connection| {
            connection.fetch_one(&query.query, tags.len(), &limits.start())
        })
        .and_then(|row| ensure_column_count(tags.len(), row.len()).map(|()| row));
    let row = match row {
        Ok(row) => row,
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

    for (column, ((returned, literal), tag)) in row.into_iter().zip(expected).zip(&tags).enumerate()
    {
        let expected = match coerce(literal, *tag) {
            Ok(value) => value,
            Err(source) => {
                return TestOutcome::errored(
                    &spec.name,
                    ErrorCause::ValueCoercion {
                        column,
                        source,
                    },
                );
            }
        };
        match compare(&returned, &expected, operator) {
            Ok(true) => {}
            Ok(false) => {
                return TestOutcome::failed(
                    &spec.name,
                    FailureReason::ColumnMismatch {
                        column,
                        operator,
                        expected,
                        returned,
                    },
                );
            }
            Err(source) => {
                return TestOutcome::errored(
                    &spec.name,
                    ErrorCause::Comparison {
                        column,
                        source,
                    },
                );
            }
        }
    }

    TestOutcome::passed(&spec.name, format!("{} columns satisfied {operator}", tags.len()))
}
