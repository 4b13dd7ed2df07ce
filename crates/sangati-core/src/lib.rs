// crates/sangati-core/src/lib.rs
// ============================================================================
// Module: Sangati Core Library
// Description: Public API surface for the Sangati assertion runner.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Sangati runs declarative assertions against relational databases. Each
//! test names one query and a list of expected literals, or two queries whose
//! result sets must match. The core is backend-agnostic: storage crates
//! implement [`DataSourceResolver`] and [`Connection`] and the runtime never
//! sees driver types.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CancelToken;
pub use interfaces::Connection;
pub use interfaces::DataSourceResolver;
pub use interfaces::ExecutionError;
pub use interfaces::NoopObserver;
pub use interfaces::QueryContext;
pub use interfaces::QueryLimits;
pub use interfaces::RunObserver;
pub use interfaces::ensure_column_count;
pub use runtime::CoercionError;
pub use runtime::CompareError;
pub use runtime::RunnerConfig;
pub use runtime::TestRunner;
pub use runtime::coerce;
pub use runtime::compare;
pub use runtime::run_tests;
