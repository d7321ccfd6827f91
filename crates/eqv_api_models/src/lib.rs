//! Transport models for answer checking.
//!
//! These types describe the JSON exchanged with callers and stay independent
//! from engine internals; conversion happens at the edge that owns both.

mod json_types;

pub use json_types::{AnswerCheckRequest, AnswerCheckResponse, QuestionType, DEFAULT_PROBLEM_TYPE};
