//! Renders a tree back into the flat algebraic syntax the parser accepts,
//! with parentheses only where binding strength requires them.

use crate::{Context, Expr, ExprId};
use num_traits::Signed;
use std::fmt;

const SUM: u8 = 1;
const PRODUCT: u8 = 2;
const POWER: u8 = 3;
const PREFIX: u8 = 4;
const ATOM: u8 = 5;

/// Binding strength of the node; a rational literal prints as `p/q`, so it
/// binds like a quotient.
fn binding(ctx: &Context, id: ExprId) -> u8 {
    match ctx.get(id) {
        Expr::Add(..) | Expr::Sub(..) => SUM,
        Expr::Mul(..) | Expr::Div(..) => PRODUCT,
        Expr::Pow(..) => POWER,
        Expr::Neg(_) => PREFIX,
        Expr::Number(n) if !n.is_integer() => PRODUCT,
        Expr::Number(n) if n.is_negative() => PREFIX,
        _ => ATOM,
    }
}

pub struct DisplayExpr<'a> {
    pub context: &'a Context,
    pub id: ExprId,
}

impl DisplayExpr<'_> {
    fn operand(&self, f: &mut fmt::Formatter<'_>, id: ExprId, wrap: bool) -> fmt::Result {
        let inner = DisplayExpr {
            context: self.context,
            id,
        };
        if wrap {
            write!(f, "({inner})")
        } else {
            write!(f, "{inner}")
        }
    }

    /// `strict_right` parenthesizes a right operand of equal strength, as in
    /// `a - (b - c)` and `a / (b / c)`.
    fn infix(
        &self,
        f: &mut fmt::Formatter<'_>,
        (l, r): (ExprId, ExprId),
        symbol: &str,
        strength: u8,
        strict_right: bool,
    ) -> fmt::Result {
        self.operand(f, l, binding(self.context, l) < strength)?;
        write!(f, " {symbol} ")?;
        let right = binding(self.context, r);
        self.operand(f, r, right < strength || (strict_right && right == strength))
    }
}

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.context;
        match ctx.get(self.id) {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Constant(c) => f.write_str(c.name()),
            Expr::Variable(s) => f.write_str(s),
            Expr::Add(l, r) => self.infix(f, (*l, *r), "+", SUM, false),
            Expr::Sub(l, r) => self.infix(f, (*l, *r), "-", SUM, true),
            Expr::Mul(l, r) => self.infix(f, (*l, *r), "*", PRODUCT, false),
            Expr::Div(l, r) => self.infix(f, (*l, *r), "/", PRODUCT, true),
            Expr::Pow(b, e) => {
                self.operand(f, *b, binding(ctx, *b) <= POWER)?;
                f.write_str("^")?;
                self.operand(f, *e, binding(ctx, *e) < ATOM)
            }
            Expr::Neg(e) => {
                f.write_str("-")?;
                self.operand(f, *e, binding(ctx, *e) < PREFIX)
            }
            Expr::Function(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.operand(f, *arg, false)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr { context: ctx, id }.to_string()
    }

    #[test]
    fn test_display() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let two = ctx.num(2);
        let mul = ctx.add(Expr::Mul(x, two));
        let e = ctx.add(Expr::Add(one, mul));
        assert_eq!(show(&ctx, e), "1 + x * 2");
    }

    #[test]
    fn test_pow_of_sum_is_parenthesized() {
        let mut ctx = Context::new();
        let a = ctx.var("a");
        let b = ctx.var("b");
        let two = ctx.num(2);
        let sum = ctx.add(Expr::Add(a, b));
        let e = ctx.add(Expr::Pow(sum, two));
        assert_eq!(show(&ctx, e), "(a + b)^2");
    }

    #[test]
    fn test_sub_keeps_right_grouping() {
        let mut ctx = Context::new();
        let a = ctx.var("a");
        let b = ctx.var("b");
        let c = ctx.var("c");
        let inner = ctx.add(Expr::Sub(b, c));
        let e = ctx.add(Expr::Sub(a, inner));
        assert_eq!(show(&ctx, e), "a - (b - c)");
    }

    #[test]
    fn test_fractional_exponent_and_function() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let half = ctx.rational(num_rational::BigRational::new(1.into(), 2.into()));
        let root = ctx.add(Expr::Pow(x, half));
        let e = ctx.call("sin", vec![root]);
        assert_eq!(show(&ctx, e), "sin(x^(1/2))");
    }
}
