// crates/sangati-core/src/runtime/comparator.rs
// ============================================================================
// Module: Sangati Comparator Logic
// Description: Operator evaluation between two typed values.
// Purpose: Decide whether a returned value satisfies an expected value.
// Dependencies: crate::core::value, thiserror
// ============================================================================

//! ## Overview
//! Both operands must carry the same type tag. Ordering is lexicographic
//! (byte-wise) for strings, numeric for integers, and chronological for dates
//! and timestamps. `Lte` and `Gte` are the disjunction of the strict relation
//! and equality so that every tag shares the same semantics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use thiserror::Error;

use crate::core::value::Operator;
use crate::core::value::OperatorName;
use crate::core::value::TypedValue;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Comparison errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    /// Operator name is not supported.
    #[error("invalid operator '{0}' specified")]
    UnknownOperator(String),
    /// Operands carry different types.
    #[error("cannot compare {left} with {right}")]
    TagMismatch {
        /// Kind label of the left operand.
        left: &'static str,
        /// Kind label of the right operand.
        right: &'static str,
    },
}

// ============================================================================
// SECTION: Comparator Evaluation
// ============================================================================

/// Resolves a declared operator name.
///
/// # Errors
///
/// Returns [`CompareError::UnknownOperator`] for unsupported names.
pub fn resolve_operator(name: &OperatorName) -> Result<Operator, CompareError> {
    name.operator().ok_or_else(|| CompareError::UnknownOperator(name.to_string()))
}

/// Evaluates `left <op> right`.
///
/// # Errors
///
/// Returns [`CompareError::TagMismatch`] when the operands carry different
/// tags, or when either operand is `Null`.
pub fn compare(left: &TypedValue, right: &TypedValue, op: Operator) -> Result<bool, CompareError> {
    let ordering = ordering(left, right)?;
    let equal = ordering == Ordering::Equal;
    Ok(match op {
        Operator::Eq => equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Lte => ordering == Ordering::Less || equal,
        Operator::Gte => ordering == Ordering::Greater || equal,
    })
}

/// Orders two values of the same tag.
fn ordering(left: &TypedValue, right: &TypedValue) -> Result<Ordering, CompareError> {
    match (left, right) {
        (TypedValue::String(left), TypedValue::String(right)) => {
            Ok(left.as_bytes().cmp(right.as_bytes()))
        }
        (TypedValue::Int(left), TypedValue::Int(right)) => Ok(left.cmp(right)),
        (TypedValue::Date(left), TypedValue::Date(right)) => Ok(left.cmp(right)),
        (TypedValue::Timestamp(left), TypedValue::Timestamp(right)) => Ok(left.cmp(right)),
        _ => Err(CompareError::TagMismatch {
            left: left.kind_label(),
            right: right.kind_label(),
        }),
    }
}

