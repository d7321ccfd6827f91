//! Request-level entry points used by transports.

use eqv_parser::strip_recognized_delimiters;
use tracing::info;

use crate::options::CheckOptions;
use crate::policy::{check_equivalence_with, check_multiple_choice, guarded};
use crate::verdict::EquivalenceVerdict;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionKind {
    #[default]
    ShortAnswer,
    MultipleChoice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerRequest {
    pub candidate: String,
    pub reference: String,
    pub kind: QuestionKind,
    pub selected_option: Option<i64>,
}

impl AnswerRequest {
    pub fn short_answer(candidate: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn multiple_choice(selected_option: Option<i64>, reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            kind: QuestionKind::MultipleChoice,
            selected_option,
            ..Self::default()
        }
    }
}

pub fn check_answer(request: &AnswerRequest, options: &CheckOptions) -> EquivalenceVerdict {
    guarded(
        || dispatch(request, options),
        EquivalenceVerdict::validation_error,
    )
}

fn dispatch(request: &AnswerRequest, options: &CheckOptions) -> EquivalenceVerdict {
    match request.kind {
        QuestionKind::MultipleChoice => match request.selected_option {
            None => EquivalenceVerdict::rejected("No option selected"),
            Some(selected) => check_multiple_choice(selected, &request.reference),
        },
        QuestionKind::ShortAnswer => check_equivalence_with(
            request.candidate.trim(),
            request.reference.trim(),
            options,
        ),
    }
}

/// Checks text produced by an external recognizer against the request's reference.
///
/// `request.candidate` is ignored; the recognized text takes its place and is
/// echoed back in `recognized_latex`.
pub fn check_recognized_answer(
    recognized: &str,
    request: &AnswerRequest,
    options: &CheckOptions,
) -> EquivalenceVerdict {
    guarded(
        || {
            let latex = strip_recognized_delimiters(recognized);
            if latex.is_empty() {
                return EquivalenceVerdict::failure(
                    "Could not recognize any math expressions in the image",
                    "OCR failed to extract any LaTeX from the image",
                )
                .with_recognized("");
            }
            info!(recognized = %latex, "checking recognized answer");
            let request = AnswerRequest {
                candidate: latex.clone(),
                ..request.clone()
            };
            dispatch(&request, options).with_recognized(latex)
        },
        |e| EquivalenceVerdict::failure("Error occurred during OCR processing", e).with_recognized(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_answer_is_trimmed() {
        let verdict = check_answer(
            &AnswerRequest::short_answer("  2x ", " x*2"),
            &CheckOptions::default(),
        );
        assert!(verdict.is_correct);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn test_multiple_choice_without_selection() {
        let verdict = check_answer(
            &AnswerRequest::multiple_choice(None, "1"),
            &CheckOptions::default(),
        );
        assert!(!verdict.is_correct);
        assert_eq!(verdict.explanation, "No option selected");
        assert_eq!(verdict.error_message, None);
    }

    #[test]
    fn test_recognized_answer() {
        let request = AnswerRequest::short_answer("ignored", "x^2");
        let verdict = check_recognized_answer("\\( x^2 \\)", &request, &CheckOptions::default());
        assert!(verdict.is_correct);
        assert_eq!(verdict.recognized_latex.as_deref(), Some("x^2"));
    }

    #[test]
    fn test_recognized_answer_empty() {
        let request = AnswerRequest::short_answer("", "x");
        let verdict = check_recognized_answer("  $$ ", &request, &CheckOptions::default());
        assert!(!verdict.is_correct);
        assert_eq!(
            verdict.explanation,
            "Could not recognize any math expressions in the image"
        );
        assert_eq!(
            verdict.error_message.as_deref(),
            Some("OCR failed to extract any LaTeX from the image")
        );
        assert_eq!(verdict.recognized_latex.as_deref(), Some(""));
    }
}
