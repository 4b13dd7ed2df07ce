// crates/sangati-core/src/runtime/coerce.rs
// ============================================================================
// Module: Sangati Type Coercion
// Description: Literal-to-typed-value conversion driven by declared types.
// Purpose: Build comparison targets from the string literals in test specs.
// Dependencies: crate::core::value, thiserror, time
// ============================================================================

//! ## Overview
//! Coercion is deterministic and side-effect free. It runs once during spec
//! validation and again during evaluation.
//!
//! Date convention: literals are read as `YYYY-MM-DD` (year, month, day).
//! Year-day-month literals such as `2024-31-01` are rejected; ambiguous ones
//! such as `2024-02-01` are always read as February 1st. Timestamps use
//! `YYYY-MM-DD HH:MM:SS.ffffff` with exactly six fractional digits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::Date;
use time::PrimitiveDateTime;

use crate::core::value::DATE_FORMAT;
use crate::core::value::TIMESTAMP_FORMAT;
use crate::core::value::TypeName;
use crate::core::value::TypeTag;
use crate::core::value::TypedValue;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Literal coercion errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// Literal is not a base-10 signed 64-bit integer.
    #[error("'{0}' is not a 64-bit integer")]
    NotAnInteger(String),
    /// Literal does not match the date or timestamp pattern.
    #[error("'{literal}' does not match {pattern}")]
    BadDateFormat {
        /// Rejected literal.
        literal: String,
        /// Human-readable expected pattern.
        pattern: &'static str,
    },
    /// Declared type is not supported.
    #[error("unsupported type '{0}'")]
    UnsupportedType(String),
}

/// Human-readable date pattern used in error messages.
const DATE_PATTERN: &str = "YYYY-MM-DD";
/// Human-readable timestamp pattern used in error messages.
const TIMESTAMP_PATTERN: &str = "YYYY-MM-DD HH:MM:SS.ffffff";

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Coerces a literal into a typed value for the given tag.
///
/// # Errors
///
/// Returns [`CoercionError`] when the literal does not parse for the tag.
pub fn coerce(literal: &str, tag: TypeTag) -> Result<TypedValue, CoercionError> {
    match tag {
        TypeTag::String => Ok(TypedValue::String(literal.to_string())),
        TypeTag::Int => literal
            .parse::<i64>()
            .map(TypedValue::Int)
            .map_err(|_| CoercionError::NotAnInteger(literal.to_string())),
        TypeTag::Date => parse_date(literal).map(TypedValue::Date),
        TypeTag::Timestamp => parse_timestamp(literal).map(TypedValue::Timestamp),
    }
}

/// Coerces a literal using a declared type name.
///
/// # Errors
///
/// Returns [`CoercionError::UnsupportedType`] for unknown names, otherwise the
/// errors of [`coerce`].
pub fn coerce_named(literal: &str, name: &TypeName) -> Result<TypedValue, CoercionError> {
    let tag = name.tag().ok_or_else(|| CoercionError::UnsupportedType(name.to_string()))?;
    coerce(literal, tag)
}

/// Parses a `YYYY-MM-DD` date literal.
///
/// # Errors
///
/// Returns [`CoercionError::BadDateFormat`] when the literal does not match.
pub fn parse_date(literal: &str) -> Result<Date, CoercionError> {
    Date::parse(literal, DATE_FORMAT).map_err(|_| CoercionError::BadDateFormat {
        literal: literal.to_string(),
        pattern: DATE_PATTERN,
    })
}

/// Parses a `YYYY-MM-DD HH:MM:SS.ffffff` timestamp literal.
///
/// # Errors
///
/// Returns [`CoercionError::BadDateFormat`] when the literal does not match.
pub fn parse_timestamp(literal: &str) -> Result<PrimitiveDateTime, CoercionError> {
    PrimitiveDateTime::parse(literal, TIMESTAMP_FORMAT).map_err(|_| CoercionError::BadDateFormat {
        literal: literal.to_string(),
        pattern: TIMESTAMP_PATTERN,
    })
}
