use serde::{Deserialize, Serialize};

pub const DEFAULT_PROBLEM_TYPE: &str = "general";

fn default_problem_type() -> String {
    DEFAULT_PROBLEM_TYPE.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    ShortAnswer,
    MultipleChoice,
}

/// Answer submitted for checking.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnswerCheckRequest {
    pub user_answer: String,
    pub correct_answer: String,
    /// Free-form subject tag; carried through but not interpreted.
    #[serde(default = "default_problem_type")]
    pub problem_type: String,
    #[serde(default)]
    pub question_type: QuestionType,
    /// Zero-based option index for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<i64>,
}

impl AnswerCheckRequest {
    pub fn new(user_answer: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self {
            user_answer: user_answer.into(),
            correct_answer: correct_answer.into(),
            problem_type: default_problem_type(),
            question_type: QuestionType::ShortAnswer,
            selected_option: None,
        }
    }
}

/// Verdict as returned to callers. `error_message` is always present, `null` when unset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnswerCheckResponse {
    pub is_correct: bool,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognized_latex: Option<String>,
    /// Name of the strategy that accepted the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl AnswerCheckResponse {
    pub fn error(explanation: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            is_correct: false,
            confidence: 0.0,
            explanation: explanation.into(),
            error_message: Some(error_message.into()),
            recognized_latex: None,
            strategy: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: AnswerCheckRequest =
            serde_json::from_value(json!({"user_answer": "2x", "correct_answer": "y=2x"})).unwrap();
        assert_eq!(req, AnswerCheckRequest::new("2x", "y=2x"));
        assert_eq!(req.problem_type, "general");
    }

    #[test]
    fn test_question_type_snake_case() {
        let req: AnswerCheckRequest = serde_json::from_value(json!({
            "user_answer": "",
            "correct_answer": "2",
            "question_type": "multiple_choice",
            "selected_option": 2
        }))
        .unwrap();
        assert_eq!(req.question_type, QuestionType::MultipleChoice);
        assert_eq!(req.selected_option, Some(2));

        let bad = serde_json::from_value::<AnswerCheckRequest>(json!({
            "user_answer": "",
            "correct_answer": "2",
            "question_type": "essay"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_response_shape() {
        let resp = AnswerCheckResponse {
            is_correct: true,
            confidence: 0.95,
            explanation: "Answer correct via rhs_equiv comparison".to_string(),
            error_message: None,
            recognized_latex: None,
            strategy: Some("rhs_equiv".to_string()),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["error_message"], serde_json::Value::Null);
        assert!(value.get("recognized_latex").is_none());
        assert_eq!(value["strategy"], "rhs_equiv");
    }

    #[test]
    fn test_error_response() {
        let resp = AnswerCheckResponse::error("Validation error", "missing field");
        assert!(!resp.is_correct);
        assert_eq!(resp.confidence, 0.0);
        assert_eq!(resp.error_message.as_deref(), Some("missing field"));
    }
}
