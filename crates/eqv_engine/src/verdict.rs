use crate::strategies::{StrategyKind, StrategyResult};

pub const VALIDATION_ERROR: &str = "Validation error";
pub const INVALID_REFERENCE: &str = "Invalid correct_answer format";

/// Final decision on one answer. Built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceVerdict {
    pub is_correct: bool,
    pub confidence: f64,
    pub explanation: String,
    pub error_message: Option<String>,
    /// Text recognized from an image, for post-OCR checks only.
    pub recognized_latex: Option<String>,
    /// Strategy that decided a short answer was correct.
    pub strategy: Option<StrategyKind>,
}

impl EquivalenceVerdict {
    /// Correct verdict carrying the deciding strategy's confidence weight.
    pub fn matched(result: &StrategyResult) -> Self {
        Self {
            is_correct: true,
            confidence: result.confidence_weight,
            explanation: format!("Answer correct via {} comparison", result.kind.name()),
            error_message: None,
            recognized_latex: None,
            strategy: Some(result.kind),
        }
    }

    pub fn mismatch(expected: &str, got: &str) -> Self {
        Self::rejected(format!("Answer is incorrect. Expected {expected}, got {got}"))
    }

    /// Categorical outcome, no strategy involved.
    pub fn categorical(is_correct: bool, explanation: impl Into<String>) -> Self {
        Self {
            is_correct,
            confidence: if is_correct { 1.0 } else { 0.0 },
            explanation: explanation.into(),
            error_message: None,
            recognized_latex: None,
            strategy: None,
        }
    }

    pub fn rejected(explanation: impl Into<String>) -> Self {
        Self::categorical(false, explanation)
    }

    pub fn failure(explanation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error_message: Some(error.into()),
            ..Self::rejected(explanation)
        }
    }

    pub fn validation_error(error: impl Into<String>) -> Self {
        Self::failure(VALIDATION_ERROR, error)
    }

    pub fn with_recognized(mut self, latex: impl Into<String>) -> Self {
        self.recognized_latex = Some(latex.into());
        self
    }
}
