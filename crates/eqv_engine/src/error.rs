use eqv_parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0}")]
    InvalidReference(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Budget exceeded: {0}")]
    Budget(String),
}
