//! The five equivalence strategies, in decision order.

use eqv_parser::{clean_latex, extract_math_expr};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::algebraic::AlgebraicCheck;
use crate::normal_form::{NormalForm, Normalizer};
use crate::options::CheckOptions;
use crate::symbolic::SymbolicForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "latex_exact")]
    ExactText,
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "symbolic")]
    Symbolic,
    #[serde(rename = "algebraic")]
    Algebraic,
    #[serde(rename = "rhs_equiv")]
    EquationRhs,
}

impl StrategyKind {
    /// Decision order.
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::ExactText,
        StrategyKind::Numeric,
        StrategyKind::Symbolic,
        StrategyKind::Algebraic,
        StrategyKind::EquationRhs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::ExactText => "latex_exact",
            StrategyKind::Numeric => "numeric",
            StrategyKind::Symbolic => "symbolic",
            StrategyKind::Algebraic => "algebraic",
            StrategyKind::EquationRhs => "rhs_equiv",
        }
    }

    /// Confidence reported when this strategy decides the verdict.
    pub fn weight(self) -> f64 {
        match self {
            StrategyKind::ExactText => 1.0,
            StrategyKind::Numeric => 0.9,
            StrategyKind::Symbolic => 0.8,
            StrategyKind::Algebraic => 0.7,
            StrategyKind::EquationRhs => 0.95,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one strategy on one pair of answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyResult {
    pub kind: StrategyKind,
    pub matched: bool,
    pub confidence_weight: f64,
}

impl StrategyResult {
    pub fn new(kind: StrategyKind, matched: bool) -> Self {
        Self {
            kind,
            matched,
            confidence_weight: kind.weight(),
        }
    }
}

/// A single way of deciding that two answers are the same.
///
/// Implementations never fail: anything that goes wrong is "no match".
pub trait EquivalenceStrategy {
    fn kind(&self) -> StrategyKind;

    fn matches(&self, candidate: &str, reference: &str, options: &CheckOptions) -> bool;

    fn evaluate(&self, candidate: &str, reference: &str, options: &CheckOptions) -> StrategyResult {
        StrategyResult::new(self.kind(), self.matches(candidate, reference, options))
    }
}

/// Identical text after extraction and cleaning.
pub struct ExactText;

/// Both sides evaluate to finite numbers within the tolerance.
pub struct Numeric;

/// Both sides simplify to the same normal form.
pub struct Symbolic;

/// Expansion, cancellation or a vanishing difference proves equality.
pub struct Algebraic;

/// Compares against the right-hand side when exactly one side is an equation.
pub struct EquationRhs;

impl EquivalenceStrategy for ExactText {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExactText
    }

    fn matches(&self, candidate: &str, reference: &str, _options: &CheckOptions) -> bool {
        clean_latex(&extract_math_expr(candidate)) == clean_latex(&extract_math_expr(reference))
    }
}

impl EquivalenceStrategy for Numeric {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Numeric
    }

    fn matches(&self, candidate: &str, reference: &str, options: &CheckOptions) -> bool {
        let (Some(a), Some(b)) = (
            SymbolicForm::parse(candidate, options),
            SymbolicForm::parse(reference, options),
        ) else {
            return false;
        };
        if !a.free_symbols().is_empty() || !b.free_symbols().is_empty() {
            debug!("numeric comparison skipped for expressions with free symbols");
            return false;
        }
        match (a.evaluate(options), b.evaluate(options)) {
            (Ok(x), Ok(y)) => (x - y).abs() < options.numeric_tolerance,
            (Err(e), _) | (_, Err(e)) => {
                debug!(error = %e, "numeric evaluation failed");
                false
            }
        }
    }
}

impl EquivalenceStrategy for Symbolic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Symbolic
    }

    fn matches(&self, candidate: &str, reference: &str, options: &CheckOptions) -> bool {
        symbolic_equal(candidate, reference, options)
    }
}

/// Shared by [`Symbolic`] and [`EquationRhs`].
pub fn symbolic_equal(candidate: &str, reference: &str, options: &CheckOptions) -> bool {
    let (Some(a), Some(b)) = (
        SymbolicForm::parse(candidate, options),
        SymbolicForm::parse(reference, options),
    ) else {
        return false;
    };
    match (a.normal_form(options), b.normal_form(options)) {
        (Ok(x), Ok(y)) => x == y || trig_equal(&x, &y, options),
        (Err(e), _) | (_, Err(e)) => {
            debug!(error = %e, "simplification failed");
            false
        }
    }
}

/// Retries unequal forms that mention sin, cos or tan after rewriting them
/// with the trigonometric identities.
fn trig_equal(x: &NormalForm, y: &NormalForm, options: &CheckOptions) -> bool {
    if !x.mentions_trig() && !y.mentions_trig() {
        return false;
    }
    let norm = Normalizer::new(options);
    match (norm.trig_canonical(x), norm.trig_canonical(y)) {
        (Ok(a), Ok(b)) => a == b,
        (Err(e), _) | (_, Err(e)) => {
            debug!(error = %e, "trigonometric rewrite gave up");
            false
        }
    }
}

impl EquivalenceStrategy for Algebraic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Algebraic
    }

    fn matches(&self, candidate: &str, reference: &str, options: &CheckOptions) -> bool {
        let (Some(a), Some(b)) = (
            SymbolicForm::parse(candidate, options),
            SymbolicForm::parse(reference, options),
        ) else {
            return false;
        };
        let (na, nb) = match (a.normal_form(options), b.normal_form(options)) {
            (Ok(na), Ok(nb)) => (na, nb),
            (Err(e), _) | (_, Err(e)) => {
                debug!(error = %e, "simplification failed");
                return false;
            }
        };

        AlgebraicCheck::ALL
            .iter()
            .any(|check| match check.run(&na, &nb, options) {
                Ok(matched) => matched,
                Err(e) => {
                    debug!(check = check.name(), error = %e, "algebraic check gave up");
                    false
                }
            })
    }
}

impl EquivalenceStrategy for EquationRhs {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EquationRhs
    }

    fn matches(&self, candidate: &str, reference: &str, options: &CheckOptions) -> bool {
        if symbolic_equal(candidate, reference, options) {
            return true;
        }
        match (right_hand_side(candidate), right_hand_side(reference)) {
            (None, Some(rhs)) => symbolic_equal(candidate, rhs, options),
            (Some(rhs), None) => symbolic_equal(rhs, reference, options),
            _ => false,
        }
    }
}

/// Text after the first `=`, trimmed.
fn right_hand_side(expr: &str) -> Option<&str> {
    expr.split_once('=').map(|(_, rhs)| rhs.trim())
}

/// All strategies in decision order.
pub fn default_strategies() -> Vec<Box<dyn EquivalenceStrategy>> {
    vec![
        Box::new(ExactText),
        Box::new(Numeric),
        Box::new(Symbolic),
        Box::new(Algebraic),
        Box::new(EquationRhs),
    ]
}
