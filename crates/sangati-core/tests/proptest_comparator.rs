// crates/sangati-core/tests/proptest_comparator.rs
// ============================================================================
// Module: Comparator Property-Based Tests
// Description: Property tests for comparator ordering laws.
// Purpose: Detect inconsistencies across wide input ranges.
// ============================================================================

//! Property-based tests for comparator invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proptest::prelude::*;
use sangati_core::Operator;
use sangati_core::TypeTag;
use sangati_core::TypedValue;
use sangati_core::coerce;
use sangati_core::compare;

const OPERATORS: [Operator; 5] =
    [Operator::Eq, Operator::Lt, Operator::Gt, Operator::Lte, Operator::Gte];

proptest! {
    #[test]
    fn integer_comparison_matches_native_ordering(a in any::<i64>(), b in any::<i64>()) {
        let (left, right) = (TypedValue::Int(a), TypedValue::Int(b));
        prop_assert_eq!(compare(&left, &right, Operator::Eq).unwrap(), a == b);
        prop_assert_eq!(compare(&left, &right, Operator::Lt).unwrap(), a < b);
        prop_assert_eq!(compare(&left, &right, Operator::Gt).unwrap(), a > b);
        prop_assert_eq!(compare(&left, &right, Operator::Lte).unwrap(), a <= b);
        prop_assert_eq!(compare(&left, &right, Operator::Gte).unwrap(), a >= b);
    }

    #[test]
    fn inclusive_operators_are_strict_or_equal(a in ".{0,8}", b in ".{0,8}") {
        let (left, right) = (TypedValue::String(a), TypedValue::String(b));
        let eq = compare(&left, &right, Operator::Eq).unwrap();
        let lt = compare(&left, &right, Operator::Lt).unwrap();
        let gt = compare(&left, &right, Operator::Gt).unwrap();
        prop_assert_eq!(compare(&left, &right, Operator::Lte).unwrap(), lt || eq);
        prop_assert_eq!(compare(&left, &right, Operator::Gte).unwrap(), gt || eq);
        prop_assert_eq!(u8::from(eq) + u8::from(lt) + u8::from(gt), 1);
    }

    #[test]
    fn comparison_is_reflexive(value in any::<i64>(), op_index in 0usize .. 5) {
        let value = TypedValue::Int(value);
        let op = OPERATORS[op_index];
        let expected = matches!(op, Operator::Eq | Operator::Lte | Operator::Gte);
        prop_assert_eq!(compare(&value, &value, op).unwrap(), expected);
    }

    #[test]
    fn integer_coercion_round_trips_display(value in any::<i64>()) {
        prop_assert_eq!(coerce(&value.to_string(), TypeTag::Int).unwrap(), TypedValue::Int(value));
    }

    #[test]
    fn coercion_never_panics(literal in ".*") {
        for tag in [TypeTag::String, TypeTag::Int, TypeTag::Date, TypeTag::Timestamp] {
            let _ = coerce(&literal, tag);
        }
    }
}
