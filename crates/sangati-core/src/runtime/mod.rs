// crates/sangati-core/src/runtime/mod.rs
// ============================================================================
// Module: Sangati Runtime
// Description: Coercion, comparison, evaluation, and the test runner.
// Purpose: Execute test specifications against resolved data sources.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules turn declared literals into typed values, evaluate
//! single-query and dual-query specs, and drive whole runs. Every entry point
//! goes through the same evaluation functions so that sequential and
//! concurrent runs produce identical outcomes.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod coerce;
pub mod comparator;
pub mod dual;
pub mod runner;
pub mod single;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use coerce::CoercionError;
pub use coerce::coerce;
pub use coerce::coerce_named;
pub use coerce::parse_date;
pub use coerce::parse_timestamp;
pub use comparator::CompareError;
pub use comparator::compare;
pub use comparator::resolve_operator;
pub use dual::evaluate_dual;
pub use runner::MAX_WORKERS;
pub use runner::RunnerConfig;
pub use runner::TestRunner;
pub use runner::run_tests;
pub use single::evaluate_single;
