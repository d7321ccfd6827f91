use eqv_ast::{Context, DisplayExpr, ExprId, VariableCollector};
use eqv_parser::parse_latex;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::error::EngineError;
use crate::evaluator::{eval_f64_checked, EvalError};
use crate::normal_form::{NormalForm, Normalizer};
use crate::options::CheckOptions;

/// A parsed answer: its own expression arena plus the root node.
#[derive(Debug, Clone)]
pub struct SymbolicForm {
    context: Context,
    root: ExprId,
}

impl SymbolicForm {
    pub fn try_parse(expr: &str, options: &CheckOptions) -> Result<Self, EngineError> {
        let mut context = Context::new();
        let root = parse_latex(expr, &mut context, &options.variables)?;
        if context.depth(root) > options.max_depth {
            return Err(EngineError::Budget("expression nested too deeply".to_string()));
        }
        Ok(Self { context, root })
    }

    /// Absent when the text does not parse; the failure is logged.
    pub fn parse(expr: &str, options: &CheckOptions) -> Option<Self> {
        match Self::try_parse(expr, options) {
            Ok(form) => Some(form),
            Err(e) => {
                debug!(input = expr, error = %e, "LaTeX to symbolic conversion failed");
                None
            }
        }
    }

    pub fn evaluate(&self, options: &CheckOptions) -> Result<f64, EvalError> {
        eval_f64_checked(&self.context, self.root, options.max_depth)
    }

    pub fn normal_form(&self, options: &CheckOptions) -> Result<NormalForm, EngineError> {
        Normalizer::new(options).normalize(&self.context, self.root)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        VariableCollector::collect(&self.context, self.root)
    }
}

impl fmt::Display for SymbolicForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            DisplayExpr {
                context: &self.context,
                id: self.root
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_and_failure() {
        let opts = CheckOptions::default();
        let form = SymbolicForm::parse("\\frac{x}{2}", &opts).unwrap();
        assert_eq!(form.to_string(), "x / 2");
        assert!(SymbolicForm::parse("not math at all ???", &opts).is_none());
        assert!(SymbolicForm::parse("", &opts).is_none());
    }

    #[test]
    fn test_evaluate_and_symbols() {
        let opts = CheckOptions::default();
        let form = SymbolicForm::parse("2^3", &opts).unwrap();
        assert_eq!(form.evaluate(&opts), Ok(8.0));
        let form = SymbolicForm::parse("x*y+x", &opts).unwrap();
        let symbols: Vec<_> = form.free_symbols().into_iter().collect();
        assert_eq!(symbols, vec!["x", "y"]);
    }

    #[test]
    fn test_depth_guard() {
        let opts = CheckOptions {
            max_depth: 3,
            ..CheckOptions::default()
        };
        assert!(matches!(
            SymbolicForm::try_parse("((x+1)+1)+1", &opts),
            Err(EngineError::Budget(_))
        ));
    }
}
