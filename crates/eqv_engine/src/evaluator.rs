//! Numeric evaluation of expressions using f64 values.
//!
//! Backs the numeric strategy: both answers must reduce to concrete finite
//! numbers, so any free variable is an evaluation failure.

use eqv_ast::{Constant, Context, Expr, ExprId};
use num_traits::ToPrimitive;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound variable {name}")]
    UnboundVariable { name: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{function} is undefined at {arg}")]
    Domain { function: String, arg: f64 },
    #[error("result is not finite")]
    NonFinite,
    #[error("expression nested too deeply")]
    DepthExceeded,
    #[error("unsupported function {0}")]
    Unsupported(String),
}

/// Evaluate an expression with no free variables.
pub fn eval_f64_checked(ctx: &Context, expr: ExprId, max_depth: usize) -> Result<f64, EvalError> {
    eval_depth(ctx, expr, max_depth)
}

fn eval_depth(ctx: &Context, expr: ExprId, depth: usize) -> Result<f64, EvalError> {
    if depth == 0 {
        return Err(EvalError::DepthExceeded);
    }

    let result = match ctx.get(expr) {
        Expr::Number(n) => n.to_f64().ok_or(EvalError::NonFinite)?,

        Expr::Variable(name) => {
            return Err(EvalError::UnboundVariable { name: name.clone() });
        }

        Expr::Constant(c) => match c {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
            Constant::Infinity => return Err(EvalError::NonFinite),
        },

        Expr::Add(l, r) => eval_depth(ctx, *l, depth - 1)? + eval_depth(ctx, *r, depth - 1)?,
        Expr::Sub(l, r) => eval_depth(ctx, *l, depth - 1)? - eval_depth(ctx, *r, depth - 1)?,
        Expr::Mul(l, r) => eval_depth(ctx, *l, depth - 1)? * eval_depth(ctx, *r, depth - 1)?,

        Expr::Div(l, r) => {
            let b = eval_depth(ctx, *r, depth - 1)?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            eval_depth(ctx, *l, depth - 1)? / b
        }

        Expr::Pow(b, e) => {
            let base = eval_depth(ctx, *b, depth - 1)?;
            let exp = eval_depth(ctx, *e, depth - 1)?;

            // base < 0 with a non-integer exponent has no real value
            if base < 0.0 && exp.fract() != 0.0 {
                return Err(EvalError::Domain {
                    function: "pow".to_string(),
                    arg: base,
                });
            }
            if base == 0.0 && exp < 0.0 {
                return Err(EvalError::DivisionByZero);
            }

            base.powf(exp)
        }

        Expr::Neg(e) => -eval_depth(ctx, *e, depth - 1)?,

        Expr::Function(name, args) => eval_function(ctx, name, args, depth)?,
    };

    if !result.is_finite() {
        return Err(EvalError::NonFinite);
    }

    Ok(result)
}

fn eval_function(ctx: &Context, name: &str, args: &[ExprId], depth: usize) -> Result<f64, EvalError> {
    let arg_vals = args
        .iter()
        .map(|a| eval_depth(ctx, *a, depth - 1))
        .collect::<Result<Vec<f64>, _>>()?;

    let single = || -> Result<f64, EvalError> {
        match arg_vals.as_slice() {
            [x] => Ok(*x),
            _ => Err(EvalError::Unsupported(name.to_string())),
        }
    };

    match name {
        "sin" => Ok(single()?.sin()),
        "cos" => Ok(single()?.cos()),
        "tan" => {
            let x = single()?;
            if x.cos() == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(x.tan())
        }
        "exp" => Ok(single()?.exp()),
        "abs" => Ok(single()?.abs()),
        "sqrt" => {
            let x = single()?;
            if x < 0.0 {
                return Err(EvalError::Domain {
                    function: "sqrt".to_string(),
                    arg: x,
                });
            }
            Ok(x.sqrt())
        }
        // natural log; log(x, b) takes an explicit base
        "log" => match arg_vals.as_slice() {
            [x] => ln_checked(*x),
            [x, base] => {
                let denom = ln_checked(*base)?;
                if denom == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(ln_checked(*x)? / denom)
            }
            _ => Err(EvalError::Unsupported(name.to_string())),
        },
        _ => Err(EvalError::Unsupported(name.to_string())),
    }
}

fn ln_checked(x: f64) -> Result<f64, EvalError> {
    if x <= 0.0 {
        return Err(EvalError::Domain {
            function: "log".to_string(),
            arg: x,
        });
    }
    Ok(x.ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqv_parser::{parse, DEFAULT_VARIABLES};

    fn eval(input: &str) -> Result<f64, EvalError> {
        let vars: Vec<String> = DEFAULT_VARIABLES.iter().map(|s| s.to_string()).collect();
        let mut ctx = Context::new();
        let e = parse(input, &mut ctx, &vars).expect("parse failed");
        eval_f64_checked(&ctx, e, 200)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1/2").unwrap(), 0.5);
        assert_eq!(eval("2^10").unwrap(), 1024.0);
        assert!((eval("sqrt(2)^2").unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constants_and_functions() {
        assert!((eval("2pi").unwrap() - std::f64::consts::TAU).abs() < 1e-12);
        assert!((eval("log(E)").unwrap() - 1.0).abs() < 1e-12);
        assert!((eval("log(8,2)").unwrap() - 3.0).abs() < 1e-12);
        assert!(eval("cos(0)").unwrap() == 1.0);
    }

    #[test]
    fn test_failures() {
        assert!(matches!(
            eval("x+1"),
            Err(EvalError::UnboundVariable { .. })
        ));
        assert_eq!(eval("1/0"), Err(EvalError::DivisionByZero));
        assert!(matches!(eval("sqrt(-1)"), Err(EvalError::Domain { .. })));
        assert!(matches!(eval("(-8)^(1/3)"), Err(EvalError::Domain { .. })));
        assert!(matches!(eval("log(0)"), Err(EvalError::Domain { .. })));
        assert_eq!(eval("oo"), Err(EvalError::NonFinite));
    }

    #[test]
    fn test_depth_limit() {
        let vars: Vec<String> = DEFAULT_VARIABLES.iter().map(|s| s.to_string()).collect();
        let mut ctx = Context::new();
        let e = parse("((1+1)+1)+1", &mut ctx, &vars).unwrap();
        assert_eq!(eval_f64_checked(&ctx, e, 2), Err(EvalError::DepthExceeded));
    }
}
