//! Sparse polynomials over Q in the atoms of an answer.
//!
//! Every indeterminate is the canonical key of an atom, so `sin(x)` or
//! `x^(1/2)` behave like plain variables. A polynomial stores its terms as
//! `(coefficient, exponents)` pairs sorted by exponent vector, where the
//! exponent vector is aligned with `vars`.

use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::collections::BTreeMap;
use thiserror::Error;

pub type VarIdx = usize;

/// Exponent per variable. Always `vars.len()` long.
pub type Exponents = Vec<u32>;

pub type Term = (BigRational, Exponents);

/// Caps applied while multiplying and raising polynomials.
#[derive(Clone, Debug)]
pub struct PolyBudget {
    pub max_terms: usize,
    pub max_total_degree: u32,
    pub max_pow_exp: u32,
}

impl Default for PolyBudget {
    fn default() -> Self {
        Self {
            max_terms: 200,
            max_total_degree: 32,
            max_pow_exp: 32,
        }
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum PolyError {
    #[error("answer is not a rational function of its atoms")]
    NonPolynomial,
    #[error("division by a zero polynomial")]
    NonConstantDivision,
    #[error("polynomial budget exceeded")]
    BudgetExceeded,
    #[error("polynomials are over different atoms")]
    VarMismatch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiPoly {
    pub vars: Vec<String>,
    /// Ascending by exponent vector, coefficients never zero.
    pub terms: Vec<Term>,
}

fn add_exps(a: &[u32], b: &[u32]) -> Exponents {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// `a - b`, or `None` when some exponent of `b` is larger.
fn sub_exps(a: &[u32], b: &[u32]) -> Option<Exponents> {
    a.iter().zip(b).map(|(x, y)| x.checked_sub(*y)).collect()
}

fn accumulate(acc: &mut BTreeMap<Exponents, BigRational>, exps: Exponents, c: BigRational) {
    *acc.entry(exps).or_insert_with(BigRational::zero) += c;
}

impl MultiPoly {
    fn with_terms(&self, terms: Vec<Term>) -> Self {
        Self {
            vars: self.vars.clone(),
            terms,
        }
    }

    fn same_vars(&self, other: &Self) -> Result<(), PolyError> {
        if self.vars == other.vars {
            Ok(())
        } else {
            Err(PolyError::VarMismatch)
        }
    }

    pub fn constant(vars: Vec<String>, c: BigRational) -> Self {
        let terms = if c.is_zero() {
            Vec::new()
        } else {
            vec![(c, vec![0; vars.len()])]
        };
        Self { vars, terms }
    }

    pub fn one(vars: Vec<String>) -> Self {
        Self::constant(vars, BigRational::one())
    }

    /// The atom `var` on its own.
    pub fn from_var(vars: Vec<String>, var: &str) -> Result<Self, PolyError> {
        let idx = vars
            .iter()
            .position(|v| v == var)
            .ok_or(PolyError::VarMismatch)?;
        let mut exps = vec![0; vars.len()];
        exps[idx] = 1;
        Ok(Self {
            vars,
            terms: vec![(BigRational::one(), exps)],
        })
    }

    /// Drops zero coefficients; the map order gives the term order.
    pub fn from_map(vars: Vec<String>, map: BTreeMap<Exponents, BigRational>) -> Self {
        let terms = map
            .into_iter()
            .filter(|(_, c)| !c.is_zero())
            .map(|(e, c)| (c, e))
            .collect();
        Self { vars, terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        match self.terms.as_slice() {
            [] => true,
            [(_, exps)] => exps.iter().all(|&e| e == 0),
            _ => false,
        }
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn degree_in(&self, v: VarIdx) -> u32 {
        self.terms
            .iter()
            .filter_map(|(_, exps)| exps.get(v).copied())
            .max()
            .unwrap_or(0)
    }

    pub fn used_vars(&self) -> Vec<VarIdx> {
        (0..self.vars.len())
            .filter(|&v| self.degree_in(v) > 0)
            .collect()
    }

    /// Coefficient of the largest term, zero for the zero polynomial.
    pub fn leading_coeff(&self) -> BigRational {
        self.terms
            .last()
            .map(|(c, _)| c.clone())
            .unwrap_or_else(BigRational::zero)
    }

    fn to_map(&self) -> BTreeMap<Exponents, BigRational> {
        self.terms
            .iter()
            .map(|(c, e)| (e.clone(), c.clone()))
            .collect()
    }
}

impl MultiPoly {
    pub fn add(&self, other: &Self) -> Result<Self, PolyError> {
        self.same_vars(other)?;
        let mut acc = self.to_map();
        for (c, e) in &other.terms {
            accumulate(&mut acc, e.clone(), c.clone());
        }
        Ok(Self::from_map(self.vars.clone(), acc))
    }

    pub fn mul_scalar(&self, k: &BigRational) -> Self {
        if k.is_zero() {
            return self.with_terms(Vec::new());
        }
        self.with_terms(self.terms.iter().map(|(c, e)| (c * k, e.clone())).collect())
    }

    pub fn mul_monomial(&self, exps: &[u32]) -> Result<Self, PolyError> {
        if exps.len() != self.vars.len() {
            return Err(PolyError::VarMismatch);
        }
        Ok(self.with_terms(
            self.terms
                .iter()
                .map(|(c, e)| (c.clone(), add_exps(e, exps)))
                .collect(),
        ))
    }

    pub fn mul(&self, other: &Self, budget: &PolyBudget) -> Result<Self, PolyError> {
        self.same_vars(other)?;
        let mut acc = BTreeMap::new();
        for (c1, e1) in &self.terms {
            for (c2, e2) in &other.terms {
                let exps = add_exps(e1, e2);
                if exps.iter().sum::<u32>() > budget.max_total_degree {
                    return Err(PolyError::BudgetExceeded);
                }
                accumulate(&mut acc, exps, c1 * c2);
                if acc.len() > budget.max_terms {
                    return Err(PolyError::BudgetExceeded);
                }
            }
        }
        Ok(Self::from_map(self.vars.clone(), acc))
    }

    /// Square-and-multiply, refusing exponents above `max_pow_exp`.
    pub fn pow(&self, exp: u32, budget: &PolyBudget) -> Result<Self, PolyError> {
        if exp > budget.max_pow_exp {
            return Err(PolyError::BudgetExceeded);
        }
        let mut result = Self::one(self.vars.clone());
        let mut square = self.clone();
        let mut rest = exp;
        while rest > 0 {
            if rest & 1 == 1 {
                result = result.mul(&square, budget)?;
            }
            rest >>= 1;
            if rest > 0 {
                square = square.mul(&square, budget)?;
            }
        }
        Ok(result)
    }
}

/// Non-negative gcd of rational coefficients: gcd of the numerators over
/// the lcm of the denominators.
pub fn rational_content<'a>(coeffs: impl IntoIterator<Item = &'a BigRational>) -> BigRational {
    coeffs.into_iter().fold(BigRational::zero(), |g, c| {
        if g.is_zero() {
            c.abs()
        } else if c.is_zero() {
            g
        } else {
            BigRational::new(g.numer().gcd(c.numer()), g.denom().lcm(c.denom()))
        }
    })
}

impl MultiPoly {
    /// Smallest exponent of each variable across every term of both operands.
    pub fn monomial_gcd_with(&self, other: &Self) -> Result<Exponents, PolyError> {
        self.same_vars(other)?;
        let mut exps: Option<Exponents> = None;
        for (_, e) in self.terms.iter().chain(&other.terms) {
            exps = Some(match exps {
                None => e.clone(),
                Some(acc) => acc.iter().zip(e).map(|(a, b)| (*a).min(*b)).collect(),
            });
        }
        Ok(exps.unwrap_or_else(|| vec![0; self.vars.len()]))
    }

    /// Divides every term by `exps`, or `None` if some term is not divisible.
    pub fn div_monomial_exact(&self, exps: &[u32]) -> Option<Self> {
        if exps.len() != self.vars.len() {
            return None;
        }
        let terms = self
            .terms
            .iter()
            .map(|(c, e)| Some((c.clone(), sub_exps(e, exps)?)))
            .collect::<Option<Vec<_>>>()?;
        Some(self.with_terms(terms))
    }

    /// Sparse long division by leading terms; `None` unless the remainder is zero.
    pub fn div_exact(&self, divisor: &Self) -> Option<Self> {
        if divisor.is_zero() || self.vars != divisor.vars {
            return None;
        }
        let (lead_c, lead_e) = divisor.terms.last()?;
        let mut remainder = self.to_map();
        let mut quotient = BTreeMap::new();

        while let Some((r_exps, r_coeff)) = remainder
            .last_key_value()
            .map(|(e, c)| (e.clone(), c.clone()))
        {
            let q_exps = sub_exps(&r_exps, lead_e)?;
            let q_coeff = &r_coeff / lead_c;
            for (c, e) in &divisor.terms {
                accumulate(&mut remainder, add_exps(e, &q_exps), -(c * &q_coeff));
            }
            remainder.retain(|_, c| !c.is_zero());
            accumulate(&mut quotient, q_exps, q_coeff);
        }

        Some(Self::from_map(self.vars.clone(), quotient))
    }
}
