//! Oversized inputs are declined within the configured budget instead of
//! running unbounded or crashing.

use eqv_engine::{check_equivalence, check_equivalence_with, CheckOptions, StrategyKind};

#[test]
fn huge_power_is_not_expanded() {
    let verdict = check_equivalence("(x+1)^1000", "x+1");
    assert!(!verdict.is_correct);
    assert_eq!(verdict.error_message, None);
}

#[test]
fn huge_integer_power_is_declined() {
    let verdict = check_equivalence("2^100000", "1");
    assert!(!verdict.is_correct);
    assert_eq!(verdict.error_message, None);
}

#[test]
fn power_within_budget_still_expands() {
    let verdict = check_equivalence("(x+1)^3", "x^3+3x^2+3x+1");
    assert_eq!(verdict.strategy, Some(StrategyKind::Algebraic));
}

#[test]
fn tighter_term_budget_declines_expansion() {
    let options = CheckOptions {
        max_terms: 4,
        ..CheckOptions::default()
    };
    let verdict = check_equivalence_with("(x+y)^4", "x^4+4x^3y+6x^2y^2+4xy^3+y^4", &options);
    assert!(!verdict.is_correct);
}

#[test]
fn deep_nesting_is_declined() {
    let nested = format!("{}x{}", "(".repeat(100), ")".repeat(100));
    let verdict = check_equivalence(&nested, "y");
    assert!(!verdict.is_correct);
    assert_eq!(verdict.error_message, None);
}

#[test]
fn long_sums_within_depth_are_evaluated() {
    let sum = vec!["1"; 100].join("+");
    let verdict = check_equivalence(&sum, "100");
    assert_eq!(verdict.strategy, Some(StrategyKind::Numeric));

    let sum = vec!["1"; 300].join("+");
    let verdict = check_equivalence(&sum, "300");
    assert!(!verdict.is_correct);
}
