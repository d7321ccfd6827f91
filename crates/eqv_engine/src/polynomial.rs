use num_rational::BigRational;
use num_traits::Zero;

use crate::multipoly::{MultiPoly, VarIdx};

/// Dense polynomial in one atom, used for exact Euclidean GCDs.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// `coeffs[i]` multiplies `var^i`; no trailing zeros.
    pub coeffs: Vec<BigRational>,
    pub var: String,
}

impl Polynomial {
    pub fn new(mut coeffs: Vec<BigRational>, var: String) -> Self {
        while coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Polynomial { coeffs, var }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn leading_coeff(&self) -> BigRational {
        self.coeffs.last().cloned().unwrap_or_else(BigRational::zero)
    }

    /// `p` read as a polynomial in `vars[var]`; `None` if another atom occurs.
    pub fn from_multipoly(p: &MultiPoly, var: VarIdx) -> Option<Self> {
        let name = p.vars.get(var)?.clone();
        let mut coeffs = vec![BigRational::zero(); p.degree_in(var) as usize + 1];
        for (c, exps) in &p.terms {
            let only_var = exps.iter().enumerate().all(|(i, &e)| i == var || e == 0);
            if !only_var {
                return None;
            }
            coeffs[exps[var] as usize] += c;
        }
        Some(Polynomial::new(coeffs, name))
    }

    pub fn to_multipoly(&self, vars: &[String], var: VarIdx) -> MultiPoly {
        let map = self
            .coeffs
            .iter()
            .enumerate()
            .map(|(power, c)| {
                let mut exps = vec![0; vars.len()];
                exps[var] = power as u32;
                (exps, c.clone())
            })
            .collect();
        MultiPoly::from_map(vars.to_vec(), map)
    }

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Polynomial::new(Vec::new(), self.var.clone());
        }
        let mut coeffs = vec![BigRational::zero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Polynomial::new(coeffs, self.var.clone())
    }

    /// `(quotient, remainder)`, or `None` for a zero divisor.
    pub fn div_rem(&self, divisor: &Self) -> Option<(Self, Self)> {
        if divisor.is_zero() {
            return None;
        }
        let d = divisor.degree();
        let lead = divisor.leading_coeff();
        let mut rem = self.coeffs.clone();
        let mut quot = vec![BigRational::zero(); self.coeffs.len().saturating_sub(d)];

        for shift in (0..quot.len()).rev() {
            let factor = &rem[shift + d] / &lead;
            if factor.is_zero() {
                continue;
            }
            for (k, c) in divisor.coeffs.iter().enumerate() {
                rem[shift + k] -= c * &factor;
            }
            quot[shift] = factor;
        }

        Some((
            Polynomial::new(quot, self.var.clone()),
            Polynomial::new(rem, self.var.clone()),
        ))
    }

    /// Monic GCD by the Euclidean algorithm; zero only if both inputs are zero.
    pub fn gcd(&self, other: &Self) -> Self {
        let (mut a, mut b) = (self.clone(), other.clone());
        while !b.is_zero() {
            let Some((_, r)) = a.div_rem(&b) else { break };
            a = b;
            b = r;
        }
        let g = a;
        if g.is_zero() {
            return g;
        }
        let lead = g.leading_coeff();
        let coeffs = g.coeffs.iter().map(|c| c / &lead).collect();
        Polynomial::new(coeffs, g.var)
    }
}
