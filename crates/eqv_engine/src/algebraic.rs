//! Algebraic equivalence: expand, factor, difference.
//!
//! Each check returns `Ok(true)` only when it proves equality. Errors mean
//! the check ran out of budget or hit an undefined value; callers treat them
//! as "not matched".

use crate::error::EngineError;
use crate::normal_form::{NormalForm, Normalizer};
use crate::options::CheckOptions;
use crate::rational::{collect_atoms, RationalFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgebraicCheck {
    Expand,
    Factor,
    Difference,
}

impl AlgebraicCheck {
    pub const ALL: [AlgebraicCheck; 3] = [
        AlgebraicCheck::Expand,
        AlgebraicCheck::Factor,
        AlgebraicCheck::Difference,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlgebraicCheck::Expand => "expand",
            AlgebraicCheck::Factor => "factor",
            AlgebraicCheck::Difference => "difference",
        }
    }

    pub fn run(
        self,
        a: &NormalForm,
        b: &NormalForm,
        options: &CheckOptions,
    ) -> Result<bool, EngineError> {
        match self {
            AlgebraicCheck::Expand => expanded_equal(a, b, options),
            AlgebraicCheck::Factor => reduced_equal(a, b, options),
            AlgebraicCheck::Difference => difference_vanishes(a, b, options),
        }
    }
}

/// `expand(a) == expand(b)`
pub fn expanded_equal(a: &NormalForm, b: &NormalForm, options: &CheckOptions) -> Result<bool, EngineError> {
    let norm = Normalizer::new(options);
    Ok(norm.expand(a)? == norm.expand(b)?)
}

/// Both sides reduce to the same quotient of coprime polynomials.
pub fn reduced_equal(a: &NormalForm, b: &NormalForm, options: &CheckOptions) -> Result<bool, EngineError> {
    let norm = Normalizer::new(options);
    let ea = norm.expand(a)?;
    let eb = norm.expand(b)?;
    let vars = collect_atoms([&ea, &eb]);
    let budget = options.poly_budget();

    let ra = RationalFunction::from_normal_form(&ea, &vars, &budget).map_err(poly_budget)?;
    let rb = RationalFunction::from_normal_form(&eb, &vars, &budget).map_err(poly_budget)?;
    Ok(ra == rb)
}

/// `a - b` simplifies to zero.
pub fn difference_vanishes(
    a: &NormalForm,
    b: &NormalForm,
    options: &CheckOptions,
) -> Result<bool, EngineError> {
    let norm = Normalizer::new(options);
    let diff = norm.expand(&norm.add(a, &b.neg())?)?;
    if diff.is_zero() {
        return Ok(true);
    }
    let vars = collect_atoms([&diff]);
    let rf = RationalFunction::from_normal_form(&diff, &vars, &options.poly_budget())
        .map_err(poly_budget)?;
    Ok(rf.is_zero())
}

fn poly_budget(err: crate::multipoly::PolyError) -> EngineError {
    EngineError::Budget(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqv_ast::Context;
    use eqv_parser::parse;

    fn forms(a: &str, b: &str, options: &CheckOptions) -> (NormalForm, NormalForm) {
        let norm = Normalizer::new(options);
        let mut ctx = Context::new();
        let ea = parse(a, &mut ctx, &options.variables).unwrap();
        let eb = parse(b, &mut ctx, &options.variables).unwrap();
        (
            norm.normalize(&ctx, ea).unwrap(),
            norm.normalize(&ctx, eb).unwrap(),
        )
    }

    fn check(which: AlgebraicCheck, a: &str, b: &str) -> Result<bool, EngineError> {
        let options = CheckOptions::default();
        let (na, nb) = forms(a, b, &options);
        which.run(&na, &nb, &options)
    }

    #[test]
    fn test_expand_matches_binomial() {
        assert_eq!(check(AlgebraicCheck::Expand, "(x+1)^2", "x^2+2x+1"), Ok(true));
        assert_eq!(check(AlgebraicCheck::Expand, "(x+1)^2", "x^2+1"), Ok(false));
    }

    #[test]
    fn test_factor_cancels() {
        assert_eq!(check(AlgebraicCheck::Expand, "(x^2-1)/(x-1)", "x+1"), Ok(false));
        assert_eq!(check(AlgebraicCheck::Factor, "(x^2-1)/(x-1)", "x+1"), Ok(true));
    }

    #[test]
    fn test_difference() {
        assert_eq!(
            check(AlgebraicCheck::Difference, "x/(x+1) + 1/(x+1)", "1"),
            Ok(true)
        );
        assert_eq!(check(AlgebraicCheck::Difference, "x", "x+1"), Ok(false));
    }

    #[test]
    fn test_budget_is_an_error() {
        let options = CheckOptions {
            max_terms: 5,
            ..CheckOptions::default()
        };
        let (na, nb) = forms("(x+y+1)^6", "1", &options);
        assert!(matches!(
            AlgebraicCheck::Expand.run(&na, &nb, &options),
            Err(EngineError::Budget(_))
        ));
    }

    #[test]
    fn test_names() {
        let names: Vec<_> = AlgebraicCheck::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["expand", "factor", "difference"]);
    }
}
