// crates/sangati-core/src/core/mod.rs
// ============================================================================
// Module: Sangati Core Types
// Description: Test specifications, typed values, and outcomes.
// Purpose: Define the data model shared by every Sangati crate.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types describe what a test asserts and what happened when it ran.
//! They carry no backend knowledge and are safe to share across threads.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod outcome;
pub mod spec;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use outcome::ErrorCause;
pub use outcome::FailureReason;
pub use outcome::OutcomeStatus;
pub use outcome::Report;
pub use outcome::TestOutcome;
pub use spec::QueryRef;
pub use spec::TestSpec;
pub use spec::ValidationError;
pub use value::DATE_FORMAT;
pub use value::Operator;
pub use value::OperatorName;
pub use value::TIMESTAMP_FORMAT;
pub use value::TypeName;
pub use value::TypeTag;
pub use value::TypedValue;
