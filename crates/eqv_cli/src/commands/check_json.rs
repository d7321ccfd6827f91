//! check-json subcommand handler.
//!
//! Reads one request document and always answers with one response document.

use std::io::Read;

use anyhow::{Context, Result};
use clap::Args;
use eqv_api_models::{AnswerCheckRequest, AnswerCheckResponse, QuestionType};
use eqv_engine::{check_answer, AnswerRequest, CheckOptions, QuestionKind};
use tracing::debug;

use crate::format::{print_pretty_json, to_response};

#[derive(Args, Debug)]
pub struct CheckJsonArgs {
    /// Request JSON; read from stdin when omitted
    pub request: Option<String>,
}

pub fn run(args: CheckJsonArgs, options: &CheckOptions) -> Result<()> {
    let input = match args.request {
        Some(json) => json,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };
    print_pretty_json(&respond(&input, options));
    Ok(())
}

pub fn respond(input: &str, options: &CheckOptions) -> AnswerCheckResponse {
    match serde_json::from_str::<AnswerCheckRequest>(input) {
        Ok(request) => {
            debug!(problem_type = %request.problem_type, "decoded answer check request");
            to_response(check_answer(&to_engine_request(request), options))
        }
        Err(e) => AnswerCheckResponse::error("Validation error", e.to_string()),
    }
}

fn to_engine_request(request: AnswerCheckRequest) -> AnswerRequest {
    AnswerRequest {
        candidate: request.user_answer,
        reference: request.correct_answer,
        kind: match request.question_type {
            QuestionType::ShortAnswer => QuestionKind::ShortAnswer,
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice,
        },
        selected_option: request.selected_option,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_answer_request() {
        let resp = respond(
            r#"{"user_answer": "2x", "correct_answer": "y=2x"}"#,
            &CheckOptions::default(),
        );
        assert!(resp.is_correct);
        assert_eq!(resp.confidence, 0.95);
    }

    #[test]
    fn test_multiple_choice_request() {
        let resp = respond(
            r#"{"user_answer": "", "correct_answer": "2", "question_type": "multiple_choice", "selected_option": 1}"#,
            &CheckOptions::default(),
        );
        assert!(!resp.is_correct);
        assert_eq!(resp.explanation, "Incorrect. Correct option was 3.");
    }

    #[test]
    fn test_malformed_request() {
        let resp = respond("{not json", &CheckOptions::default());
        assert!(!resp.is_correct);
        assert_eq!(resp.explanation, "Validation error");
        assert!(resp.error_message.is_some());
    }
}
