//! Decision policy: the first matching strategy in fixed order decides.

use eqv_parser::{clean_latex, extract_math_expr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::options::CheckOptions;
use crate::strategies::default_strategies;
use crate::verdict::{EquivalenceVerdict, INVALID_REFERENCE};

/// Compares a short answer against the reference with default options.
pub fn check_equivalence(candidate: &str, reference: &str) -> EquivalenceVerdict {
    check_equivalence_with(candidate, reference, &CheckOptions::default())
}

pub fn check_equivalence_with(
    candidate: &str,
    reference: &str,
    options: &CheckOptions,
) -> EquivalenceVerdict {
    guarded(
        || decide(candidate, reference, options),
        EquivalenceVerdict::validation_error,
    )
}

fn decide(candidate: &str, reference: &str, options: &CheckOptions) -> EquivalenceVerdict {
    let user_expr = clean_latex(&extract_math_expr(candidate));
    let correct_expr = clean_latex(&extract_math_expr(reference));

    for strategy in default_strategies() {
        let result = strategy.evaluate(&user_expr, &correct_expr, options);
        debug!(
            strategy = result.kind.name(),
            matched = result.matched,
            "strategy evaluated"
        );
        if result.matched {
            let verdict = EquivalenceVerdict::matched(&result);
            debug!(confidence = verdict.confidence, "answer correct");
            return verdict;
        }
    }

    debug!(candidate = %user_expr, reference = %correct_expr, "no strategy matched");
    EquivalenceVerdict::mismatch(&correct_expr, &user_expr)
}

/// Multiple-choice comparison against an integer reference index.
pub fn check_multiple_choice(selected_index: i64, reference_index: &str) -> EquivalenceVerdict {
    match parse_reference_index(reference_index) {
        Ok(correct) if correct == selected_index => {
            EquivalenceVerdict::categorical(true, "Correct answer selected")
        }
        Ok(correct) => EquivalenceVerdict::rejected(format!(
            "Incorrect. Correct option was {}.",
            correct.saturating_add(1)
        )),
        Err(e) => {
            warn!(reference = reference_index, "multiple-choice reference is not an index");
            EquivalenceVerdict::failure(INVALID_REFERENCE, e.to_string())
        }
    }
}

fn parse_reference_index(reference: &str) -> Result<i64, EngineError> {
    reference
        .trim()
        .parse::<i64>()
        .map_err(|_| EngineError::InvalidReference(INVALID_REFERENCE.to_string()))
}

/// Runs `f`, converting a panic into a verdict built by `on_failure`.
pub(crate) fn guarded<F, E>(f: F, on_failure: E) -> EquivalenceVerdict
where
    F: FnOnce() -> EquivalenceVerdict,
    E: FnOnce(String) -> EquivalenceVerdict,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(verdict) => verdict,
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            warn!(error = %panic_msg, "answer check failed");
            on_failure(panic_msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{EquivalenceStrategy, StrategyKind, StrategyResult, Symbolic};

    #[test]
    fn test_first_match_decides() {
        let verdict = check_equivalence("x+1", "x+1");
        assert_eq!(verdict.strategy, Some(StrategyKind::ExactText));
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.explanation, "Answer correct via latex_exact comparison");
        assert_eq!(verdict.error_message, None);
    }

    #[test]
    fn test_confidence_comes_from_strategy_result() {
        let options = CheckOptions::default();
        let result = Symbolic.evaluate("1+x", "x+1", &options);
        assert!(result.matched);
        let verdict = check_equivalence("1+x", "x+1");
        assert_eq!(verdict.strategy, Some(result.kind));
        assert_eq!(verdict.confidence, result.confidence_weight);

        let scaled = StrategyResult {
            confidence_weight: 0.5,
            ..result
        };
        assert_eq!(EquivalenceVerdict::matched(&scaled).confidence, 0.5);
    }

    #[test]
    fn test_incorrect_reports_normalized_inputs() {
        let verdict = check_equivalence("$ x + 2 $", "x + 1");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(verdict.explanation, "Answer is incorrect. Expected x+1, got x+2");
        assert_eq!(verdict.strategy, None);
    }

    #[test]
    fn test_multiple_choice() {
        let verdict = check_multiple_choice(2, "2");
        assert!(verdict.is_correct);
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.explanation, "Correct answer selected");

        let verdict = check_multiple_choice(1, " 2 ");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.explanation, "Incorrect. Correct option was 3.");
        assert_eq!(verdict.error_message, None);
    }

    #[test]
    fn test_multiple_choice_invalid_reference() {
        let verdict = check_multiple_choice(0, "B");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.explanation, "Invalid correct_answer format");
        assert_eq!(
            verdict.error_message.as_deref(),
            Some("Invalid correct_answer format")
        );
    }

    #[test]
    fn test_guarded_converts_panic() {
        let verdict = guarded(
            || panic!("boom"),
            EquivalenceVerdict::validation_error,
        );
        assert!(!verdict.is_correct);
        assert_eq!(verdict.explanation, "Validation error");
        assert_eq!(verdict.error_message.as_deref(), Some("boom"));
    }
}
