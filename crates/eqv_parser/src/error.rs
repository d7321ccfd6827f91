use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    NomError(String),
    #[error("Unconsumed input: {0}")]
    UnconsumedInput(String),
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Function {name} does not take {count} argument(s)")]
    InvalidArity { name: String, count: usize },
    #[error("Empty expression")]
    Empty,
}
