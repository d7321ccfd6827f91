//! Answer equivalence engine.
//!
//! Decides whether a candidate answer denotes the same mathematical object as
//! a reference answer by trying five strategies in a fixed order:
//! exact text, numeric, symbolic, algebraic and equation right-hand side.
//!
//! ```
//! use eqv_engine::check_equivalence;
//!
//! let verdict = check_equivalence("(x+1)^2", "x^2+2x+1");
//! assert!(verdict.is_correct);
//! assert_eq!(verdict.confidence, 0.7);
//! ```

pub mod algebraic;
pub mod api;
pub mod error;
pub mod evaluator;
pub mod multipoly;
pub mod normal_form;
pub mod options;
pub mod policy;
pub mod polynomial;
pub mod rational;
pub mod strategies;
pub mod symbolic;
pub mod verdict;

pub use api::{check_answer, check_recognized_answer, AnswerRequest, QuestionKind};
pub use error::EngineError;
pub use options::CheckOptions;
pub use policy::{check_equivalence, check_equivalence_with, check_multiple_choice};
pub use strategies::{default_strategies, EquivalenceStrategy, StrategyKind, StrategyResult};
pub use symbolic::SymbolicForm;
pub use verdict::EquivalenceVerdict;
