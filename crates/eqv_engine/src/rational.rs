//! Rational functions over opaque atoms.
//!
//! An expanded [`NormalForm`] is read as a quotient of two [`MultiPoly`]s:
//! every integer power of a symbol or grouped sum becomes polynomial
//! arithmetic, and anything else (radicals, calls, symbolic exponents) is
//! an atom keyed by its canonical text.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::collections::BTreeSet;

use crate::multipoly::{MultiPoly, PolyBudget, PolyError};
use crate::normal_form::{Base, Monomial, NormalForm};
use crate::polynomial::Polynomial;

/// `num / den` with `gcd(num, den) = 1` (as far as it can be computed) and
/// a monic denominator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalFunction {
    pub num: MultiPoly,
    pub den: MultiPoly,
}

/// Atom names shared by both sides of a comparison.
pub fn collect_atoms<'a>(forms: impl IntoIterator<Item = &'a NormalForm>) -> Vec<String> {
    let mut atoms = BTreeSet::new();
    for nf in forms {
        collect_into(nf, &mut atoms);
    }
    atoms.into_iter().collect()
}

fn collect_into(nf: &NormalForm, atoms: &mut BTreeSet<String>) {
    for (mono, _) in nf.terms() {
        for (base, exp) in mono.factors() {
            match (base, exp.as_integer()) {
                (Base::Group(inner), Some(_)) => collect_into(inner, atoms),
                (_, Some(_)) => {
                    atoms.insert(base.to_string());
                }
                (_, None) => {
                    atoms.insert(atom_key(base, exp));
                }
            }
        }
    }
}

fn atom_key(base: &Base, exp: &NormalForm) -> String {
    Monomial::from_factor(base.clone(), exp.clone()).to_string()
}

impl RationalFunction {
    pub fn constant(vars: &[String], c: BigRational) -> Self {
        Self {
            num: MultiPoly::constant(vars.to_vec(), c),
            den: MultiPoly::one(vars.to_vec()),
        }
    }

    fn atom(vars: &[String], key: &str) -> Result<Self, PolyError> {
        Ok(Self {
            num: MultiPoly::from_var(vars.to_vec(), key)?,
            den: MultiPoly::one(vars.to_vec()),
        })
    }

    /// Converts an expanded normal form; `vars` must contain every atom.
    pub fn from_normal_form(
        nf: &NormalForm,
        vars: &[String],
        budget: &PolyBudget,
    ) -> Result<Self, PolyError> {
        let mut acc = Self::constant(vars, BigRational::zero());
        for (mono, coeff) in nf.terms() {
            let mut term = Self::constant(vars, coeff.clone());
            for (base, exp) in mono.factors() {
                let factor = match exp.as_integer() {
                    Some(k) => {
                        let b = match base {
                            Base::Group(inner) => Self::from_normal_form(inner, vars, budget)?,
                            other => Self::atom(vars, &other.to_string())?,
                        };
                        b.powi(&k, budget)?
                    }
                    None => Self::atom(vars, &atom_key(base, exp))?,
                };
                term = term.mul(&factor, budget)?;
            }
            acc = acc.add(&term, budget)?;
        }
        Ok(acc)
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn add(&self, other: &Self, budget: &PolyBudget) -> Result<Self, PolyError> {
        if self.den == other.den {
            return Self {
                num: self.num.add(&other.num)?,
                den: self.den.clone(),
            }
            .reduce(budget);
        }
        let left = self.num.mul(&other.den, budget)?;
        let right = other.num.mul(&self.den, budget)?;
        Self {
            num: left.add(&right)?,
            den: self.den.mul(&other.den, budget)?,
        }
        .reduce(budget)
    }

    pub fn mul(&self, other: &Self, budget: &PolyBudget) -> Result<Self, PolyError> {
        Self {
            num: self.num.mul(&other.num, budget)?,
            den: self.den.mul(&other.den, budget)?,
        }
        .reduce(budget)
    }

    pub fn powi(&self, k: &BigInt, budget: &PolyBudget) -> Result<Self, PolyError> {
        let e = k
            .abs()
            .to_u32()
            .filter(|e| *e <= budget.max_pow_exp)
            .ok_or(PolyError::BudgetExceeded)?;
        if k.is_negative() {
            if self.num.is_zero() {
                return Err(PolyError::NonConstantDivision);
            }
            return Self {
                num: self.den.pow(e, budget)?,
                den: self.num.pow(e, budget)?,
            }
            .reduce(budget);
        }
        Ok(Self {
            num: self.num.pow(e, budget)?,
            den: self.den.pow(e, budget)?,
        })
    }

    /// Cancels the common factor and makes the denominator monic.
    fn reduce(self, budget: &PolyBudget) -> Result<Self, PolyError> {
        let vars = self.num.vars.clone();
        if self.num.is_zero() {
            return Ok(Self::constant(&vars, BigRational::zero()));
        }

        let g = poly_gcd(&self.num, &self.den, budget)?;
        let num = self.num.div_exact(&g).unwrap_or(self.num);
        let den = self.den.div_exact(&g).unwrap_or(self.den);

        let lc = den.leading_coeff();
        if lc.is_zero() || lc.is_one() {
            return Ok(Self { num, den });
        }
        let inv = BigRational::one() / lc;
        Ok(Self {
            num: num.mul_scalar(&inv),
            den: den.mul_scalar(&inv),
        })
    }
}

/// GCD up to a constant factor.
///
/// Exact for univariate inputs (Euclid); for several variables it takes the
/// monomial gcd and then tries whether one side divides the other.
fn poly_gcd(a: &MultiPoly, b: &MultiPoly, budget: &PolyBudget) -> Result<MultiPoly, PolyError> {
    let vars = a.vars.clone();
    if a.is_constant() || b.is_constant() {
        return Ok(MultiPoly::one(vars));
    }

    let mono = a.monomial_gcd_with(b)?;
    let a1 = a.div_monomial_exact(&mono).ok_or(PolyError::NonPolynomial)?;
    let b1 = b.div_monomial_exact(&mono).ok_or(PolyError::NonPolynomial)?;

    let used: BTreeSet<usize> = a1.used_vars().into_iter().chain(b1.used_vars()).collect();
    let core = if a1.is_constant() || b1.is_constant() {
        MultiPoly::one(vars.clone())
    } else if used.len() == 1 {
        let var = *used.iter().next().ok_or(PolyError::NonPolynomial)?;
        match (
            Polynomial::from_multipoly(&a1, var),
            Polynomial::from_multipoly(&b1, var),
        ) {
            (Some(pa), Some(pb)) => pa.gcd(&pb).to_multipoly(&vars, var),
            _ => MultiPoly::one(vars.clone()),
        }
    } else if a1.div_exact(&b1).is_some() {
        b1.clone()
    } else if b1.div_exact(&a1).is_some() {
        a1.clone()
    } else {
        MultiPoly::one(vars.clone())
    };

    let g = core.mul_monomial(&mono)?;
    if g.num_terms() > budget.max_terms {
        return Err(PolyError::BudgetExceeded);
    }
    Ok(g)
}
