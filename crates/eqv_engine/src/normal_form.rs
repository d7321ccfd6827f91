//! Canonical simplified form of an expression.
//!
//! A [`NormalForm`] is a sum of rational multiples of [`Monomial`]s, each
//! monomial a product of bases raised to (possibly symbolic) exponents. Two
//! expressions are symbolically equal when their normal forms are equal.
//!
//! Sums are never distributed over products here: `(x+1)^2` stays a power of
//! a grouped sum. [`Normalizer::expand`] produces the fully distributed form
//! used by the algebraic checks.

use eqv_ast::{Constant, Context, Expr, ExprId, Visitor};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::EngineError;
use crate::multipoly::rational_content;
use crate::options::CheckOptions;

/// Largest bit size of an exact rational power.
const MAX_POW_BITS: u64 = 1 << 16;

/// Largest root degree that is simplified exactly.
const MAX_ROOT_DEGREE: u32 = 64;

/// Trial divisors used to pull perfect powers out of a radicand.
const TRIAL_DIVISOR_BOUND: u32 = 100;

/// Settling number factors converges in a couple of rounds.
const MAX_SETTLE_ROUNDS: usize = 16;

/// Rounds of trigonometric rewriting before the form is taken as is.
const MAX_TRIG_ROUNDS: usize = 8;

const TRIG_NAMES: [&str; 3] = ["sin", "cos", "tan"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Base {
    Number(BigRational),
    Constant(Constant),
    Symbol(String),
    Call(String, Vec<NormalForm>),
    /// A sum that is kept as a single factor.
    Group(Box<NormalForm>),
}

/// Product of bases; each base maps to a non-zero exponent.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Monomial {
    factors: BTreeMap<Base, NormalForm>,
}

/// Sum of terms; the empty monomial is the constant term and no coefficient is zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct NormalForm {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Monomial {
    pub fn one() -> Self {
        Self::default()
    }

    pub fn from_factor(base: Base, exp: NormalForm) -> Self {
        let mut factors = BTreeMap::new();
        if !exp.is_zero() {
            factors.insert(base, exp);
        }
        Self { factors }
    }

    pub fn is_one(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn factors(&self) -> impl Iterator<Item = (&Base, &NormalForm)> {
        self.factors.iter()
    }

    pub fn single_factor(&self) -> Option<(&Base, &NormalForm)> {
        if self.factors.len() == 1 {
            self.factors.iter().next()
        } else {
            None
        }
    }
}

impl NormalForm {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::rational(BigRational::one())
    }

    pub fn integer(n: i64) -> Self {
        Self::rational(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn rational(r: BigRational) -> Self {
        Self::from_term(r, Monomial::one())
    }

    pub fn from_term(coeff: BigRational, mono: Monomial) -> Self {
        let mut terms = BTreeMap::new();
        if !coeff.is_zero() {
            terms.insert(mono, coeff);
        }
        Self { terms }
    }

    /// `base^1` with unit coefficient.
    pub fn atom(base: Base) -> Self {
        Self::from_term(BigRational::one(), Monomial::from_factor(base, Self::one()))
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_rational().is_some_and(|r| r.is_one())
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    pub fn as_rational(&self) -> Option<BigRational> {
        match self.single_term() {
            None if self.is_zero() => Some(BigRational::zero()),
            Some((c, m)) if m.is_one() => Some(c.clone()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<BigInt> {
        self.as_rational()
            .filter(|r| r.is_integer())
            .map(|r| r.to_integer())
    }

    pub fn single_term(&self) -> Option<(&BigRational, &Monomial)> {
        if self.terms.len() == 1 {
            self.terms.iter().next().map(|(m, c)| (c, m))
        } else {
            None
        }
    }

    /// Sign convention for odd/even function folding: the last term decides.
    pub fn is_negative(&self) -> bool {
        self.terms
            .values()
            .next_back()
            .is_some_and(|c| c.is_negative())
    }

    pub fn neg(&self) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), -c))
                .collect(),
        }
    }

    pub fn scale(&self, k: &BigRational) -> Self {
        if k.is_zero() {
            return Self::zero();
        }
        Self {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * k))
                .collect(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut terms = self.terms.clone();
        for (mono, coeff) in &other.terms {
            add_term(&mut terms, mono.clone(), coeff.clone());
        }
        Self { terms }
    }

    /// True when `pred` holds for some base, looking inside call arguments,
    /// groups and exponents.
    pub fn any_base(&self, pred: &impl Fn(&Base) -> bool) -> bool {
        self.terms
            .keys()
            .flat_map(|m| m.factors.iter())
            .any(|(base, exp)| {
                pred(base)
                    || exp.any_base(pred)
                    || match base {
                        Base::Call(_, args) => args.iter().any(|a| a.any_base(pred)),
                        Base::Group(inner) => inner.any_base(pred),
                        _ => false,
                    }
            })
    }

    pub fn has_symbols(&self) -> bool {
        self.any_base(&|b| matches!(b, Base::Symbol(_)))
    }

    pub fn mentions_trig(&self) -> bool {
        self.any_base(&|b| matches!(b, Base::Call(name, _) if TRIG_NAMES.contains(&name.as_str())))
    }
}

/// Value of a subtree that mentions infinity, on the extended real line.
#[derive(Debug)]
enum Extended {
    Finite(NormalForm),
    Infinite { negative: bool },
}

impl Extended {
    fn neg(self) -> Self {
        match self {
            Extended::Finite(nf) => Extended::Finite(nf.neg()),
            Extended::Infinite { negative } => Extended::Infinite { negative: !negative },
        }
    }
}

fn infinity_form(negative: bool) -> NormalForm {
    let oo = NormalForm::atom(Base::Constant(Constant::Infinity));
    if negative {
        oo.neg()
    } else {
        oo
    }
}

fn indeterminate(what: &str) -> EngineError {
    EngineError::Evaluation(format!("indeterminate form {what}"))
}

struct InfinityFinder {
    found: bool,
}

impl Visitor for InfinityFinder {
    fn enter(&mut self, context: &Context, id: ExprId) -> bool {
        if matches!(context.get(id), Expr::Constant(Constant::Infinity)) {
            self.found = true;
        }
        !self.found
    }
}

fn mentions_infinity(ctx: &Context, root: ExprId) -> bool {
    let mut finder = InfinityFinder { found: false };
    finder.walk(ctx, root);
    finder.found
}

fn add_term(terms: &mut BTreeMap<Monomial, BigRational>, mono: Monomial, coeff: BigRational) {
    if coeff.is_zero() {
        return;
    }
    let sum = match terms.remove(&mono) {
        Some(existing) => existing + coeff,
        None => coeff,
    };
    if !sum.is_zero() {
        terms.insert(mono, sum);
    }
}

/// Inserts `base^exp`, adding exponents on collision. Returns true on collision.
fn merge_factor(factors: &mut BTreeMap<Base, NormalForm>, base: Base, exp: NormalForm) -> bool {
    let (merged, collided) = match factors.remove(&base) {
        Some(existing) => (existing.add(&exp), true),
        None => (exp, false),
    };
    if !merged.is_zero() {
        factors.insert(base, merged);
    }
    collided
}

fn budget(what: &str) -> EngineError {
    EngineError::Budget(what.to_string())
}

fn rational_bits(r: &BigRational) -> u64 {
    r.numer().bits().max(r.denom().bits())
}

/// `r^k` for an integer `k`, bounded by [`MAX_POW_BITS`].
fn rational_int_pow(r: &BigRational, k: &BigInt) -> Result<BigRational, EngineError> {
    if k.is_zero() {
        return Ok(BigRational::one());
    }
    if r.is_zero() {
        if k.is_negative() {
            return Err(EngineError::Evaluation("division by zero".to_string()));
        }
        return Ok(BigRational::zero());
    }
    let e = k
        .abs()
        .to_u32()
        .filter(|e| rational_bits(r).saturating_mul(u64::from(*e)) <= MAX_POW_BITS)
        .ok_or_else(|| budget("power too large"))?;
    let numer = r.numer().pow(e);
    let denom = r.denom().pow(e);
    if k.is_negative() {
        Ok(BigRational::new(denom, numer))
    } else {
        Ok(BigRational::new(numer, denom))
    }
}

/// Splits a positive integer `m` into `(outside, inside)` with
/// `m^(1/d) = outside * inside^(1/d)`.
fn split_perfect_power(m: &BigInt, d: u32) -> (BigInt, BigInt) {
    let mut outside = BigInt::one();
    let mut inside = BigInt::one();
    let mut rest = m.clone();

    for p in 2..=TRIAL_DIVISOR_BOUND {
        let p = BigInt::from(p);
        let mut count = 0u32;
        while (&rest % &p).is_zero() {
            rest /= &p;
            count += 1;
        }
        outside *= p.pow(count / d);
        inside *= p.pow(count % d);
    }

    let root = rest.nth_root(d);
    if root.pow(d) == rest {
        outside *= root;
    } else {
        inside *= rest;
    }
    (outside, inside)
}

/// Builds normal forms under the budget of one comparison.
pub struct Normalizer<'a> {
    options: &'a CheckOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(options: &'a CheckOptions) -> Self {
        Self { options }
    }

    pub fn normalize(&self, ctx: &Context, root: ExprId) -> Result<NormalForm, EngineError> {
        if ctx.depth(root) > self.options.max_depth {
            return Err(budget("expression nested too deeply"));
        }
        if !mentions_infinity(ctx, root) {
            return self.from_expr(ctx, root);
        }
        match self.extended(ctx, root)? {
            Extended::Finite(nf) => Ok(nf),
            Extended::Infinite { negative } => Ok(infinity_form(negative)),
        }
    }

    /// Evaluates a tree that mentions `oo` with the extended-real rules.
    /// Indeterminate forms such as `oo - oo`, `0 * oo`, `oo / oo` and
    /// `oo^0` are errors; a constant added to `oo` is absorbed.
    fn extended(&self, ctx: &Context, id: ExprId) -> Result<Extended, EngineError> {
        if !mentions_infinity(ctx, id) {
            return self.from_expr(ctx, id).map(Extended::Finite);
        }
        match ctx.get(id) {
            Expr::Constant(Constant::Infinity) => Ok(Extended::Infinite { negative: false }),
            Expr::Neg(e) => Ok(self.extended(ctx, *e)?.neg()),
            Expr::Add(l, r) => {
                let a = self.extended(ctx, *l)?;
                let b = self.extended(ctx, *r)?;
                self.extended_add(a, b)
            }
            Expr::Sub(l, r) => {
                let a = self.extended(ctx, *l)?;
                let b = self.extended(ctx, *r)?;
                self.extended_add(a, b.neg())
            }
            Expr::Mul(l, r) => {
                let a = self.extended(ctx, *l)?;
                let b = self.extended(ctx, *r)?;
                self.extended_mul(a, b)
            }
            Expr::Div(l, r) => {
                let a = self.extended(ctx, *l)?;
                let b = self.extended(ctx, *r)?;
                self.extended_div(a, b)
            }
            Expr::Pow(b, e) => {
                let base = self.extended(ctx, *b)?;
                let exp = self.extended(ctx, *e)?;
                self.extended_pow(base, exp)
            }
            Expr::Function(name, args) => {
                let args = args
                    .iter()
                    .map(|a| self.extended(ctx, *a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.extended_call(name, args)
            }
            Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) => {
                self.from_expr(ctx, id).map(Extended::Finite)
            }
        }
    }

    fn extended_add(&self, a: Extended, b: Extended) -> Result<Extended, EngineError> {
        use Extended::*;
        match (a, b) {
            (Finite(x), Finite(y)) => Ok(Finite(self.add(&x, &y)?)),
            (Infinite { negative }, Finite(x)) | (Finite(x), Infinite { negative }) => {
                if x.has_symbols() {
                    return Err(indeterminate("oo plus an unknown"));
                }
                Ok(Infinite { negative })
            }
            (Infinite { negative: p }, Infinite { negative: q }) if p == q => {
                Ok(Infinite { negative: p })
            }
            (Infinite { .. }, Infinite { .. }) => Err(indeterminate("oo - oo")),
        }
    }

    fn extended_mul(&self, a: Extended, b: Extended) -> Result<Extended, EngineError> {
        use Extended::*;
        match (a, b) {
            (Finite(x), Finite(y)) => Ok(Finite(self.mul(&x, &y)?)),
            (Infinite { negative }, Finite(x)) | (Finite(x), Infinite { negative }) => {
                match x.as_rational() {
                    Some(r) if r.is_zero() => Err(indeterminate("0 * oo")),
                    Some(r) => Ok(Infinite {
                        negative: negative != r.is_negative(),
                    }),
                    None => Err(indeterminate("oo times a factor of unknown sign")),
                }
            }
            (Infinite { negative: p }, Infinite { negative: q }) => {
                Ok(Infinite { negative: p != q })
            }
        }
    }

    fn extended_div(&self, a: Extended, b: Extended) -> Result<Extended, EngineError> {
        use Extended::*;
        match (a, b) {
            (Finite(x), Finite(y)) => {
                let inv = self.pow(&y, &NormalForm::integer(-1))?;
                Ok(Finite(self.mul(&x, &inv)?))
            }
            (Finite(x), Infinite { .. }) => {
                if x.has_symbols() {
                    return Err(indeterminate("unknown / oo"));
                }
                Ok(Finite(NormalForm::zero()))
            }
            (Infinite { negative }, Finite(x)) => match x.as_rational() {
                Some(r) if r.is_zero() => {
                    Err(EngineError::Evaluation("division by zero".to_string()))
                }
                Some(r) => Ok(Infinite {
                    negative: negative != r.is_negative(),
                }),
                None => Err(indeterminate("oo over a divisor of unknown sign")),
            },
            (Infinite { .. }, Infinite { .. }) => Err(indeterminate("oo / oo")),
        }
    }

    fn extended_pow(&self, base: Extended, exp: Extended) -> Result<Extended, EngineError> {
        use Extended::*;
        let one = BigRational::one();
        match (base, exp) {
            (Finite(b), Finite(e)) => Ok(Finite(self.pow(&b, &e)?)),
            (Infinite { negative }, Finite(e)) => {
                let q = e
                    .as_rational()
                    .ok_or_else(|| indeterminate("oo to an unknown power"))?;
                if q.is_zero() {
                    return Err(indeterminate("oo^0"));
                }
                if q.is_negative() {
                    return Ok(Finite(NormalForm::zero()));
                }
                if !negative {
                    return Ok(Infinite { negative: false });
                }
                if !q.is_integer() {
                    return Err(indeterminate("(-oo) to a fractional power"));
                }
                Ok(Infinite {
                    negative: q.to_integer().is_odd(),
                })
            }
            (Finite(b), Infinite { negative }) => {
                let r = b
                    .as_rational()
                    .ok_or_else(|| indeterminate("unknown base to the power oo"))?;
                let growing = if negative { r > BigRational::zero() && r < one } else { r > one };
                let vanishing = if negative { r > one } else { r.abs() < one };
                if growing {
                    Ok(Infinite { negative: false })
                } else if vanishing {
                    Ok(Finite(NormalForm::zero()))
                } else {
                    Err(indeterminate("power of oo with no limit"))
                }
            }
            (Infinite { negative: true }, Infinite { .. }) => Err(indeterminate("(-oo)^oo")),
            (Infinite { negative: false }, Infinite { negative }) => {
                if negative {
                    Ok(Finite(NormalForm::zero()))
                } else {
                    Ok(Infinite { negative: false })
                }
            }
        }
    }

    fn extended_call(&self, name: &str, args: Vec<Extended>) -> Result<Extended, EngineError> {
        use Extended::*;
        if args.iter().all(|a| matches!(a, Finite(_))) {
            let args = args
                .into_iter()
                .filter_map(|a| match a {
                    Finite(nf) => Some(nf),
                    Infinite { .. } => None,
                })
                .collect();
            return Ok(Finite(self.call(name, args)?));
        }
        match (name, args.as_slice()) {
            ("abs", [Infinite { .. }]) => Ok(Infinite { negative: false }),
            ("sqrt" | "log" | "exp", [Infinite { negative: false }]) => {
                Ok(Infinite { negative: false })
            }
            ("exp", [Infinite { negative: true }]) => Ok(Finite(NormalForm::zero())),
            _ => Err(indeterminate(&format!("{name} at oo"))),
        }
    }

    fn from_expr(&self, ctx: &Context, id: ExprId) -> Result<NormalForm, EngineError> {
        match ctx.get(id) {
            Expr::Number(n) => Ok(NormalForm::rational(n.clone())),
            Expr::Constant(c) => Ok(NormalForm::atom(Base::Constant(*c))),
            Expr::Variable(name) => Ok(NormalForm::atom(Base::Symbol(name.clone()))),
            Expr::Add(l, r) => {
                let a = self.from_expr(ctx, *l)?;
                let b = self.from_expr(ctx, *r)?;
                self.add(&a, &b)
            }
            Expr::Sub(l, r) => {
                let a = self.from_expr(ctx, *l)?;
                let b = self.from_expr(ctx, *r)?;
                self.add(&a, &b.neg())
            }
            Expr::Mul(l, r) => {
                let a = self.from_expr(ctx, *l)?;
                let b = self.from_expr(ctx, *r)?;
                self.mul(&a, &b)
            }
            Expr::Div(l, r) => {
                let a = self.from_expr(ctx, *l)?;
                let b = self.from_expr(ctx, *r)?;
                let inv = self.pow(&b, &NormalForm::integer(-1))?;
                self.mul(&a, &inv)
            }
            Expr::Pow(b, e) => {
                let base = self.from_expr(ctx, *b)?;
                let exp = self.from_expr(ctx, *e)?;
                self.pow(&base, &exp)
            }
            Expr::Neg(e) => Ok(self.from_expr(ctx, *e)?.neg()),
            Expr::Function(name, args) => {
                let args = args
                    .iter()
                    .map(|a| self.from_expr(ctx, *a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, args)
            }
        }
    }

    fn check_terms(&self, nf: NormalForm) -> Result<NormalForm, EngineError> {
        if nf.num_terms() > self.options.max_terms {
            return Err(budget("too many terms"));
        }
        Ok(nf)
    }

    pub fn add(&self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        self.check_terms(a.add(b))
    }

    pub fn mul(&self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        if let Some(k) = a.as_rational() {
            return Ok(b.scale(&k));
        }
        if let Some(k) = b.as_rational() {
            return Ok(a.scale(&k));
        }
        let (ca, ma) = self.as_product(a);
        let (cb, mb) = self.as_product(b);
        let (c, m) = self.mul_monomials(&ma, &mb)?;
        Ok(NormalForm::from_term(ca * cb * c, m))
    }

    /// Views `nf` as `coeff * monomial`, grouping sums into a single factor.
    fn as_product(&self, nf: &NormalForm) -> (BigRational, Monomial) {
        if let Some((c, m)) = nf.single_term() {
            return (c.clone(), m.clone());
        }
        let (c, inner) = Self::make_group(nf);
        (c, Monomial::from_factor(Base::Group(Box::new(inner)), NormalForm::one()))
    }

    /// Pulls the rational content out of a sum so that `s = c * s'` and the
    /// last term of `s'` has a positive coefficient.
    fn make_group(sum: &NormalForm) -> (BigRational, NormalForm) {
        let mut c = rational_content(sum.terms.values());
        if c.is_zero() {
            return (BigRational::zero(), NormalForm::zero());
        }
        if sum.is_negative() {
            c = -c;
        }
        let inner = sum.scale(&(BigRational::one() / &c));
        (c, inner)
    }

    fn mul_monomials(&self, a: &Monomial, b: &Monomial) -> Result<(BigRational, Monomial), EngineError> {
        let mut factors = a.factors.clone();
        for (base, exp) in &b.factors {
            merge_factor(&mut factors, base.clone(), exp.clone());
        }
        self.settle(factors)
    }

    /// Folds number bases with rational exponents into the coefficient as
    /// far as exact arithmetic allows.
    fn settle(&self, mut factors: BTreeMap<Base, NormalForm>) -> Result<(BigRational, Monomial), EngineError> {
        let mut coeff = BigRational::one();

        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut next = BTreeMap::new();
            let mut changed = false;

            for (base, exp) in factors {
                match (&base, exp.as_rational()) {
                    (Base::Number(r), Some(q)) => {
                        let (c, rest) = self.number_power(r, &q)?;
                        if !c.is_one() || rest.as_ref() != Some(&(r.clone(), q.clone())) {
                            changed = true;
                        }
                        coeff *= c;
                        if let Some((radicand, f)) = rest {
                            changed |= merge_factor(
                                &mut next,
                                Base::Number(radicand),
                                NormalForm::rational(f),
                            );
                        }
                    }
                    _ => {
                        merge_factor(&mut next, base, exp);
                    }
                }
            }

            factors = next;
            if !changed {
                break;
            }
        }

        Ok((coeff, Monomial { factors }))
    }

    /// `r^q` as `coeff * radicand^f` with `0 < f < 1`, when a radical remains.
    #[allow(clippy::type_complexity)]
    fn number_power(
        &self,
        r: &BigRational,
        q: &BigRational,
    ) -> Result<(BigRational, Option<(BigRational, BigRational)>), EngineError> {
        if q.is_zero() || r.is_one() {
            return Ok((BigRational::one(), None));
        }
        if r.is_zero() {
            if q.is_negative() {
                return Err(EngineError::Evaluation("division by zero".to_string()));
            }
            return Ok((BigRational::zero(), None));
        }

        let k = q.floor();
        let f = q - &k;
        let coeff = rational_int_pow(r, &k.to_integer())?;
        if f.is_zero() {
            return Ok((coeff, None));
        }

        let degree = f.denom().to_u32().filter(|d| *d <= MAX_ROOT_DEGREE);
        let (Some(d), Some(a)) = (degree, f.numer().to_u32()) else {
            return Ok((coeff, Some((r.clone(), f))));
        };
        if r.is_negative() {
            return Ok((coeff, Some((r.clone(), f))));
        }

        // (N/D)^(a/d) = (N * D^(d-1))^(a/d) / D^a
        let denom_bits = r.denom().bits().saturating_mul(u64::from(d));
        if denom_bits > MAX_POW_BITS {
            return Ok((coeff, Some((r.clone(), f))));
        }
        let radicand = r.numer() * r.denom().pow(d - 1);
        let (outside, inside) = split_perfect_power(&radicand, d);
        let coeff = coeff * BigRational::new(outside.pow(a), r.denom().pow(a));

        if inside.is_one() {
            Ok((coeff, None))
        } else {
            Ok((coeff, Some((BigRational::from_integer(inside), f))))
        }
    }

    pub fn pow(&self, base: &NormalForm, exp: &NormalForm) -> Result<NormalForm, EngineError> {
        if let Some(q) = exp.as_rational() {
            return self.pow_rational(base, &q);
        }

        if let Some(r) = base.as_rational() {
            if r.is_one() {
                return Ok(NormalForm::one());
            }
            return Ok(NormalForm::from_term(
                BigRational::one(),
                Monomial::from_factor(Base::Number(r), exp.clone()),
            ));
        }

        // x^y stays flat; anything richer is grouped
        if let Some((c, m)) = base.single_term() {
            if let (true, Some((b, e))) = (c.is_one(), m.single_factor()) {
                if e.is_one() {
                    return Ok(NormalForm::from_term(
                        BigRational::one(),
                        Monomial::from_factor(b.clone(), exp.clone()),
                    ));
                }
            }
        }

        Ok(NormalForm::from_term(
            BigRational::one(),
            Monomial::from_factor(Base::Group(Box::new(base.clone())), exp.clone()),
        ))
    }

    fn pow_rational(&self, base: &NormalForm, q: &BigRational) -> Result<NormalForm, EngineError> {
        if q.is_zero() {
            return Ok(NormalForm::one());
        }
        if q.is_one() {
            return Ok(base.clone());
        }

        if let Some(r) = base.as_rational() {
            let (c, rest) = self.number_power(&r, q)?;
            return Ok(match rest {
                None => NormalForm::rational(c),
                Some((radicand, f)) => NormalForm::from_term(
                    c,
                    Monomial::from_factor(Base::Number(radicand), NormalForm::rational(f)),
                ),
            });
        }

        let (c, m) = self.as_product(base);

        if q.is_integer() {
            let coeff = rational_int_pow(&c, &q.to_integer())?;
            let factors = m
                .factors
                .iter()
                .map(|(b, e)| (b.clone(), e.scale(q)))
                .collect();
            let (c2, m2) = self.settle(factors)?;
            return Ok(NormalForm::from_term(coeff * c2, m2));
        }

        // Non-integer exponent: only a positive coefficient may be split off.
        let (abs_c, sign) = if c.is_negative() {
            (-c, -BigRational::one())
        } else {
            (c, BigRational::one())
        };

        let mut factors = BTreeMap::new();
        let (coeff, rest) = self.number_power(&abs_c, q)?;
        if let Some((radicand, f)) = rest {
            merge_factor(&mut factors, Base::Number(radicand), NormalForm::rational(f));
        }

        let combinable = match m.single_factor() {
            Some((b, e)) if sign.is_one() => e
                .as_rational()
                .filter(|k| *k > -BigRational::one() && *k <= BigRational::one())
                .map(|k| (b.clone(), k)),
            _ => None,
        };

        match combinable {
            Some((b, k)) => {
                merge_factor(&mut factors, b, NormalForm::rational(k * q));
            }
            None => {
                let inner = Self::group_inner(&NormalForm::from_term(sign, m));
                merge_factor(&mut factors, Base::Group(Box::new(inner)), NormalForm::rational(q.clone()));
            }
        }

        let (c2, mono) = self.settle(factors)?;
        Ok(NormalForm::from_term(coeff * c2, mono))
    }

    /// Unwraps `±Group(s)^1` so grouping never nests a lone group.
    fn group_inner(nf: &NormalForm) -> NormalForm {
        if let Some((c, m)) = nf.single_term() {
            if let Some((Base::Group(inner), e)) = m.single_factor() {
                if e.is_one() && c.is_one() {
                    return (**inner).clone();
                }
                if e.is_one() && (-c).is_one() {
                    return inner.neg();
                }
            }
        }
        nf.clone()
    }

    /// Applies a named function, folding the values that have exact forms.
    pub fn call(&self, name: &str, args: Vec<NormalForm>) -> Result<NormalForm, EngineError> {
        match (name, args.as_slice()) {
            ("sqrt", [a]) => self.pow(a, &NormalForm::rational(BigRational::new(1.into(), 2.into()))),
            ("exp", [a]) => self.pow(&NormalForm::atom(Base::Constant(Constant::E)), a),
            ("log", [a]) => self.log(a),
            ("log", [a, b]) => {
                let num = self.log(a)?;
                let den = self.log(b)?;
                if den.is_zero() {
                    return Err(EngineError::Evaluation("logarithm base 1".to_string()));
                }
                let inv = self.pow(&den, &NormalForm::integer(-1))?;
                self.mul(&num, &inv)
            }
            ("sin" | "cos" | "tan", [a]) => Ok(self.trig(name, a)),
            ("abs", [a]) => Ok(match a.as_rational() {
                Some(r) => NormalForm::rational(r.abs()),
                None => Self::call_atom(name, args),
            }),
            _ => Ok(Self::call_atom(name, args)),
        }
    }

    fn call_atom(name: &str, args: Vec<NormalForm>) -> NormalForm {
        NormalForm::atom(Base::Call(name.to_string(), args))
    }

    fn log(&self, a: &NormalForm) -> Result<NormalForm, EngineError> {
        if let Some(r) = a.as_rational() {
            if r.is_zero() {
                return Err(EngineError::Evaluation("logarithm of zero".to_string()));
            }
            if r.is_one() {
                return Ok(NormalForm::zero());
            }
        }
        // log(E^q) = q
        if let Some((c, m)) = a.single_term() {
            if let (true, Some((Base::Constant(Constant::E), e))) = (c.is_one(), m.single_factor()) {
                if let Some(q) = e.as_rational() {
                    return Ok(NormalForm::rational(q));
                }
            }
        }
        Ok(Self::call_atom("log", vec![a.clone()]))
    }

    fn trig(&self, name: &str, a: &NormalForm) -> NormalForm {
        if let Some(value) = pi_multiple(a).and_then(|r| known_trig(name, &r)) {
            return NormalForm::rational(value);
        }
        if a.is_negative() {
            let folded = Self::call_atom(name, vec![a.neg()]);
            return if name == "cos" { folded } else { folded.neg() };
        }
        Self::call_atom(name, vec![a.clone()])
    }

    /// Fully distributed form: every integer power of a sum is multiplied out.
    pub fn expand(&self, nf: &NormalForm) -> Result<NormalForm, EngineError> {
        self.distribute(nf, false)
    }

    /// Distributed form with `tan` written as `sin/cos`, double angles
    /// halved and even powers of `cos` traded for `1 - sin^2`, repeated
    /// until nothing changes.
    pub fn trig_canonical(&self, nf: &NormalForm) -> Result<NormalForm, EngineError> {
        let mut current = self.distribute(nf, true)?;
        for _ in 1..MAX_TRIG_ROUNDS {
            let next = self.distribute(&current, true)?;
            if next == current {
                break;
            }
            current = next;
        }
        Ok(current)
    }

    fn distribute(&self, nf: &NormalForm, trig: bool) -> Result<NormalForm, EngineError> {
        let mut total = NormalForm::zero();
        for (mono, coeff) in nf.terms() {
            let mut term = NormalForm::rational(coeff.clone());
            for (base, exp) in mono.factors() {
                let factor = self.expand_factor(base, exp, trig)?;
                term = self.mul_expanded(&term, &factor)?;
            }
            total = self.add(&total, &term)?;
        }
        Ok(total)
    }

    fn expand_factor(
        &self,
        base: &Base,
        exp: &NormalForm,
        trig: bool,
    ) -> Result<NormalForm, EngineError> {
        let exp = self.distribute(exp, trig)?;
        let base = match base {
            Base::Number(r) => NormalForm::rational(r.clone()),
            Base::Group(inner) => self.distribute(inner, trig)?,
            Base::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|a| self.distribute(a, trig))
                    .collect::<Result<Vec<_>, _>>()?;
                if trig {
                    return self.trig_factor(name, args, &exp);
                }
                self.call(name, args)?
            }
            other => NormalForm::atom(other.clone()),
        };
        self.raise(&base, &exp)
    }

    /// `base^exp`, multiplied out for a positive integer `exp`.
    fn raise(&self, base: &NormalForm, exp: &NormalForm) -> Result<NormalForm, EngineError> {
        if let Some(k) = exp.as_integer().filter(|k| k.is_positive()) {
            let k = k
                .to_u32()
                .filter(|k| *k <= self.options.max_pow_exp)
                .ok_or_else(|| budget("power too large to expand"))?;
            return self.pow_expanded(base, k);
        }
        self.pow(base, exp)
    }

    fn trig_factor(
        &self,
        name: &str,
        args: Vec<NormalForm>,
        exp: &NormalForm,
    ) -> Result<NormalForm, EngineError> {
        if args.len() != 1 {
            let base = self.call(name, args)?;
            return self.raise(&base, exp);
        }
        let u = &args[0];
        let sin = |v: &NormalForm| self.call("sin", vec![v.clone()]);
        let cos = |v: &NormalForm| self.call("cos", vec![v.clone()]);
        let two = BigRational::from_integer(2.into());

        let base = match (name, halved(u)) {
            ("tan", _) => {
                let sec = self.pow(&cos(u)?, &NormalForm::integer(-1))?;
                self.mul(&sin(u)?, &sec)?
            }
            // sin(2v) = 2 sin(v) cos(v)
            ("sin", Some(v)) => self.mul_expanded(&sin(&v)?, &cos(&v)?)?.scale(&two),
            // cos(2v) = 1 - 2 sin(v)^2
            ("cos", Some(v)) => {
                let sin_squared = self.pow_expanded(&sin(&v)?, 2)?;
                NormalForm::one().add(&sin_squared.scale(&-two))
            }
            ("cos", None) => {
                let power = exp
                    .as_integer()
                    .and_then(|k| k.to_u32())
                    .filter(|k| (2..=self.options.max_pow_exp).contains(k));
                if let Some(k) = power {
                    let sin_squared = self.pow_expanded(&sin(u)?, 2)?;
                    let pythagorean = NormalForm::one().add(&sin_squared.neg());
                    let even = self.pow_expanded(&pythagorean, k / 2)?;
                    let odd = self.pow_expanded(&cos(u)?, k % 2)?;
                    return self.mul_expanded(&even, &odd);
                }
                cos(u)?
            }
            _ => self.call(name, vec![u.clone()])?,
        };
        self.raise(&base, exp)
    }

    fn pow_expanded(&self, base: &NormalForm, mut k: u32) -> Result<NormalForm, EngineError> {
        let mut result = NormalForm::one();
        let mut square = base.clone();
        while k > 0 {
            if k.is_odd() {
                result = self.mul_expanded(&result, &square)?;
            }
            k >>= 1;
            if k > 0 {
                square = self.mul_expanded(&square, &square)?;
            }
        }
        Ok(result)
    }

    fn mul_expanded(&self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        let mut terms = BTreeMap::new();
        for (ma, ca) in a.terms() {
            for (mb, cb) in b.terms() {
                let (c, m) = self.mul_monomials(ma, mb)?;
                add_term(&mut terms, m, ca * cb * c);
                if terms.len() > self.options.max_terms {
                    return Err(budget("too many terms"));
                }
            }
        }
        Ok(NormalForm { terms })
    }
}

/// `v` with `u = 2v`, when `u` is one term with an even integer coefficient.
fn halved(u: &NormalForm) -> Option<NormalForm> {
    let (c, m) = u.single_term()?;
    if !c.is_integer() || c.to_integer().is_odd() {
        return None;
    }
    Some(NormalForm::from_term(c / BigRational::from_integer(2.into()), m.clone()))
}

/// `a = r*pi` for a rational `r`.
fn pi_multiple(a: &NormalForm) -> Option<BigRational> {
    if a.is_zero() {
        return Some(BigRational::zero());
    }
    let (c, m) = a.single_term()?;
    match m.single_factor()? {
        (Base::Constant(Constant::Pi), e) if e.is_one() => Some(c.clone()),
        _ => None,
    }
}

/// Exact values at multiples of pi/6 that are rational.
fn known_trig(name: &str, r: &BigRational) -> Option<BigRational> {
    let sixths = r * BigRational::from_integer(6.into());
    if !sixths.is_integer() {
        return None;
    }
    let step = sixths.to_integer().mod_floor(&BigInt::from(12)).to_i64()?;

    let sin = |s: i64| -> Option<BigRational> {
        let (n, d) = match s.rem_euclid(12) {
            0 | 6 => (0, 1),
            1 | 5 => (1, 2),
            3 => (1, 1),
            7 | 11 => (-1, 2),
            9 => (-1, 1),
            _ => return None,
        };
        Some(BigRational::new(n.into(), d.into()))
    };

    match name {
        "sin" => sin(step),
        "cos" => sin(step + 3),
        "tan" => {
            let (s, c) = (sin(step)?, sin(step + 3)?);
            if c.is_zero() {
                None
            } else {
                Some(s / c)
            }
        }
        _ => None,
    }
}

fn write_rational(f: &mut fmt::Formatter<'_>, r: &BigRational) -> fmt::Result {
    if r.is_integer() && !r.is_negative() {
        write!(f, "{}", r)
    } else {
        write!(f, "({})", r)
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base::Number(r) => write_rational(f, r),
            Base::Constant(c) => write!(f, "{}", c.name()),
            Base::Symbol(s) => write!(f, "{}", s),
            Base::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Base::Group(inner) => write!(f, "({})", inner),
        }
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return write!(f, "1");
        }
        for (i, (base, exp)) in self.factors.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{}", base)?;
            if !exp.is_one() {
                match exp.as_rational() {
                    Some(r) => {
                        write!(f, "^")?;
                        write_rational(f, &r)?;
                    }
                    None => write!(f, "^({})", exp)?,
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for NormalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        for (i, (mono, coeff)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            if mono.is_one() {
                write_rational(f, coeff)?;
            } else if coeff.is_one() {
                write!(f, "{}", mono)?;
            } else if (-coeff).is_one() {
                write!(f, "-{}", mono)?;
            } else {
                write_rational(f, coeff)?;
                write!(f, "*{}", mono)?;
            }
        }
        Ok(())
    }
}
