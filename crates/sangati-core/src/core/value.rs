// crates/sangati-core/src/core/value.rs
// ============================================================================
// Module: Sangati Typed Values
// Description: Declared type tags, comparison operators, and typed values.
// Purpose: Give expected literals and returned columns one comparable shape.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Test specifications declare types and operators as plain names. Those names
//! are kept verbatim ([`TypeName`], [`OperatorName`]) so that an unsupported
//! spelling is a recoverable per-test error instead of a decode failure for
//! the whole configuration. Parsing a name yields the closed [`TypeTag`] or
//! [`Operator`] enums used by the evaluators.
//!
//! [`TypedValue`] is the tagged union produced both by literal coercion and by
//! data-source connections. Connections also produce [`TypedValue::Null`] for
//! SQL NULL, which never compares equal to a typed literal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Calendar date format (`YYYY-MM-DD`).
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Timestamp format with microsecond precision (`YYYY-MM-DD HH:MM:SS.ffffff`).
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
);

// ============================================================================
// SECTION: Type Tags
// ============================================================================

/// Supported value types.
///
/// # Invariants
/// - Variants are stable; the lower-case name is the only accepted spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// UTF-8 string compared byte-wise.
    String,
    /// Signed 64-bit integer.
    Int,
    /// Calendar date.
    Date,
    /// Date and time without offset, microsecond precision.
    Timestamp,
}

impl TypeTag {
    /// Parses a declared type name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "date" => Some(Self::Date),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Returns the canonical name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type name as written in a test specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Creates a new declared type name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the name into a supported tag.
    #[must_use]
    pub fn tag(&self) -> Option<TypeTag> {
        TypeTag::parse(&self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<TypeTag> for TypeName {
    fn from(value: TypeTag) -> Self {
        Self::new(value.as_str())
    }
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Comparison operators applied between a returned and an expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal.
    Eq,
    /// Strictly less than.
    Lt,
    /// Strictly greater than.
    Gt,
    /// Less than or equal.
    Lte,
    /// Greater than or equal.
    Gte,
}

impl Operator {
    /// Parses a declared operator name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "lt" => Some(Self::Lt),
            "gt" => Some(Self::Gt),
            "lte" => Some(Self::Lte),
            "gte" => Some(Self::Gte),
            _ => None,
        }
    }

    /// Returns the canonical operator name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Gte => "gte",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared operator name as written in a test specification.
///
/// # Invariants
/// - An empty name is valid for query-vs-query tests, which ignore operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorName(String);

impl OperatorName {
    /// Creates a new declared operator name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the name into a supported operator.
    #[must_use]
    pub fn operator(&self) -> Option<Operator> {
        Operator::parse(&self.0)
    }
}

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OperatorName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Operator> for OperatorName {
    fn from(value: Operator) -> Self {
        Self::new(value.as_str())
    }
}

// ============================================================================
// SECTION: Typed Values
// ============================================================================

/// Comparable value carrying its type.
///
/// # Invariants
/// - `Null` has no [`TypeTag`]; it only ever equals another `Null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypedValue {
    /// String value.
    String(String),
    /// Integer value.
    Int(i64),
    /// Calendar date value.
    Date(Date),
    /// Timestamp value.
    Timestamp(PrimitiveDateTime),
    /// SQL NULL returned by a data source.
    Null,
}

impl TypedValue {
    /// Returns the type tag of the value, or `None` for `Null`.
    #[must_use]
    pub const fn tag(&self) -> Option<TypeTag> {
        match self {
            Self::String(_) => Some(TypeTag::String),
            Self::Int(_) => Some(TypeTag::Int),
            Self::Date(_) => Some(TypeTag::Date),
            Self::Timestamp(_) => Some(TypeTag::Timestamp),
            Self::Null => None,
        }
    }

    /// Returns a stable label for the value kind.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self.tag() {
            Some(tag) => tag.as_str(),
            None => "null",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "'{value}'"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Date(value) => {
                let rendered = value.format(DATE_FORMAT).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
            Self::Timestamp(value) => {
                let rendered = value.format(TIMESTAMP_FORMAT).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
            Self::Null => f.write_str("NULL"),
        }
    }
}
