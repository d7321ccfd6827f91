pub mod error;
pub mod latex;
pub mod parser;

pub use error::ParseError;
pub use latex::{clean_latex, extract_math_expr, strip_recognized_delimiters, translate_macros};
pub use parser::{parse, parse_latex, DEFAULT_VARIABLES};
