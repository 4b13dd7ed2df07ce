// crates/sangati-core/src/core/spec.rs
// ============================================================================
// Module: Sangati Test Specification
// Description: Declarative test specifications and structural validation.
// Purpose: Define the canonical test shape and reject malformed specs early.
// Dependencies: crate::core::value, crate::runtime::coerce, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`TestSpec`] names one or two queries, the declared column types, a
//! comparison operator, and optional literal expected values. Specs are
//! validated before any query runs; a validation failure fails only that spec.
//!
//! Field aliases accept the PascalCase keys of the legacy JSON format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::value::OperatorName;
use crate::core::value::TypeName;
use crate::core::value::TypeTag;
use crate::runtime::coerce::CoercionError;
use crate::runtime::coerce::coerce;

// ============================================================================
// SECTION: Query References
// ============================================================================

/// Query text bound to the data source that executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRef {
    /// Index of the data source that runs the query.
    #[serde(alias = "DbIndex")]
    pub db_index: u32,
    /// SQL text.
    #[serde(alias = "Query")]
    pub query: String,
}

impl QueryRef {
    /// Creates a query reference.
    #[must_use]
    pub fn new(db_index: u32, query: impl Into<String>) -> Self {
        Self {
            db_index,
            query: query.into(),
        }
    }
}

// ============================================================================
// SECTION: Test Specification
// ============================================================================

/// Declarative description of one database assertion.
///
/// # Invariants
/// - Immutable once decoded; evaluators only borrow it.
/// - `values = []` is equivalent to omitting `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Test name used in reports.
    #[serde(alias = "Name")]
    pub name: String,
    /// Declared column types in column order.
    #[serde(alias = "Types")]
    pub types: Vec<TypeName>,
    /// One query (compare against literals) or two (compare result sets).
    #[serde(alias = "Queries")]
    pub queries: Vec<QueryRef>,
    /// Comparison operator for single-query tests.
    #[serde(default, alias = "Operator")]
    pub operator: OperatorName,
    /// Expected literal values, one per declared type.
    #[serde(default, alias = "Values", alias = "expected_values")]
    pub values: Option<Vec<String>>,
}

impl TestSpec {
    /// Returns the expected literals when present and non-empty.
    #[must_use]
    pub fn expected_values(&self) -> Option<&[String]> {
        self.values.as_deref().filter(|values| !values.is_empty())
    }

    /// Returns the number of columns every query must produce.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.types.len()
    }

    /// Validates the structural invariants of the spec.
    ///
    /// Expected literals are coerced to catch malformed values early; the
    /// coerced values are discarded and rebuilt at evaluation time.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let tags = self.resolved_tags()?;

        let query_count = self.queries.len();
        if !(1 ..= 2).contains(&query_count) {
            return Err(ValidationError::InvalidQueryCount(query_count));
        }

        let Some(values) = self.expected_values() else {
            if query_count == 1 {
                return Err(ValidationError::MissingExpectedValues);
            }
            return Ok(());
        };

        if values.len() != tags.len() {
            return Err(ValidationError::LengthMismatch {
                types: tags.len(),
                values: values.len(),
            });
        }

        for (column, (literal, tag)) in values.iter().zip(&tags).enumerate() {
            coerce(literal, *tag).map_err(|source| ValidationError::ValueCoercion {
                column,
                source,
            })?;
        }

        Ok(())
    }

    /// Resolves every declared type name into a supported tag.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTypeList`] or
    /// [`ValidationError::UnsupportedType`].
    pub fn resolved_tags(&self) -> Result<Vec<TypeTag>, ValidationError> {
        if self.types.is_empty() {
            return Err(ValidationError::EmptyTypeList);
        }
        self.types
            .iter()
            .enumerate()
            .map(|(column, name)| {
                name.tag().ok_or_else(|| ValidationError::UnsupportedType {
                    column,
                    name: name.to_string(),
                })
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Test specification validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No types were declared.
    #[error("the types list must contain at least one supported type")]
    EmptyTypeList,
    /// A declared type is not supported.
    #[error("unsupported type '{name}' at column {column}")]
    UnsupportedType {
        /// Column position of the declared type.
        column: usize,
        /// Declared type name.
        name: String,
    },
    /// Expected values and declared types differ in length.
    #[error("types and values are not the same length ({types} types, {values} values)")]
    LengthMismatch {
        /// Number of declared types.
        types: usize,
        /// Number of expected values.
        values: usize,
    },
    /// An expected literal cannot be coerced to its declared type.
    #[error("value at column {column} is invalid: {source}")]
    ValueCoercion {
        /// Column position of the literal.
        column: usize,
        /// Coercion failure.
        source: CoercionError,
    },
    /// Test declares zero or more than two queries.
    #[error("a test must declare one or two queries, found {0}")]
    InvalidQueryCount(usize),
    /// A single-query test declares no expected values.
    #[error("a single-query test must declare expected values")]
    MissingExpectedValues,
}
