use eqv_ast::{Constant, Context, Expr, ExprId};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, char, digit1, multispace0, one_of, satisfy},
    combinator::{map, not, opt, peek, recognize},
    multi::{fold_many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::error::ParseError;
use crate::latex::translate_macros;

/// Symbol alphabet answers are parsed over unless the caller supplies another.
pub const DEFAULT_VARIABLES: &[&str] = &["x", "y", "z", "a", "b", "c", "n", "i"];

const FUNCTION_NAMES: &[&str] = &["sqrt", "sin", "cos", "tan", "log", "ln", "exp", "abs"];

/// Names recognized inside a letter run besides the variable alphabet.
const RESERVED_WORDS: &[(&str, Reserved)] = &[
    ("theta", Reserved::Theta),
    ("pi", Reserved::Constant(Constant::Pi)),
    ("oo", Reserved::Constant(Constant::Infinity)),
    ("E", Reserved::Constant(Constant::E)),
];

// Inputs past these limits are rejected up front so recursion stays shallow.
const MAX_INPUT_LEN: usize = 2048;
const MAX_NESTING: usize = 64;

/// Largest power of ten accepted in `1.5e12` style literals.
const MAX_DECIMAL_EXPONENT: u32 = 1000;

#[derive(Debug, Clone, Copy)]
enum Reserved {
    Theta,
    Constant(Constant),
}

// Intermediate AST for parsing
#[derive(Debug, Clone)]
enum ParseNode {
    Number(BigRational),
    Word(String), // letter run, split into symbols when lowered
    Add(Box<ParseNode>, Box<ParseNode>),
    Sub(Box<ParseNode>, Box<ParseNode>),
    Mul(Box<ParseNode>, Box<ParseNode>),
    Div(Box<ParseNode>, Box<ParseNode>),
    Pow(Box<ParseNode>, Box<ParseNode>),
    Neg(Box<ParseNode>),
    Function(String, Vec<ParseNode>),
}

impl ParseNode {
    fn lower(self, ctx: &mut Context, variables: &[String]) -> Result<ExprId, ParseError> {
        let id = match self {
            ParseNode::Number(n) => ctx.add(Expr::Number(n)),
            ParseNode::Word(word) => lower_word(&word, ctx, variables)?,
            ParseNode::Add(l, r) => {
                let lid = l.lower(ctx, variables)?;
                let rid = r.lower(ctx, variables)?;
                ctx.add(Expr::Add(lid, rid))
            }
            ParseNode::Sub(l, r) => {
                let lid = l.lower(ctx, variables)?;
                let rid = r.lower(ctx, variables)?;
                ctx.add(Expr::Sub(lid, rid))
            }
            ParseNode::Mul(l, r) => {
                let lid = l.lower(ctx, variables)?;
                let rid = r.lower(ctx, variables)?;
                ctx.add(Expr::Mul(lid, rid))
            }
            ParseNode::Div(l, r) => {
                let lid = l.lower(ctx, variables)?;
                let rid = r.lower(ctx, variables)?;
                ctx.add(Expr::Div(lid, rid))
            }
            ParseNode::Pow(b, e) => {
                let bid = b.lower(ctx, variables)?;
                let eid = e.lower(ctx, variables)?;
                ctx.add(Expr::Pow(bid, eid))
            }
            ParseNode::Neg(e) => {
                let eid = e.lower(ctx, variables)?;
                ctx.add(Expr::Neg(eid))
            }
            ParseNode::Function(name, args) => {
                let name = canonical_function(&name, args.len())?;
                let arg_ids = args
                    .into_iter()
                    .map(|a| a.lower(ctx, variables))
                    .collect::<Result<Vec<_>, _>>()?;
                ctx.call(name, arg_ids)
            }
        };
        Ok(id)
    }
}

/// `ln` is an alias of the natural `log`; `log(x, b)` takes an explicit base.
fn canonical_function(name: &str, count: usize) -> Result<&'static str, ParseError> {
    let canonical = match (name, count) {
        ("log" | "ln", 1 | 2) => "log",
        ("sqrt", 1) => "sqrt",
        ("sin", 1) => "sin",
        ("cos", 1) => "cos",
        ("tan", 1) => "tan",
        ("exp", 1) => "exp",
        ("abs", 1) => "abs",
        _ => {
            return Err(ParseError::InvalidArity {
                name: name.to_string(),
                count,
            })
        }
    };
    Ok(canonical)
}

/// Splits a letter run into an implicit product, longest known name first.
/// `xy` becomes `x*y`, `2pi` is handled upstream, `theta` stays whole.
fn lower_word(word: &str, ctx: &mut Context, variables: &[String]) -> Result<ExprId, ParseError> {
    let mut factors = Vec::new();
    let mut rest = word;

    while !rest.is_empty() {
        let reserved = RESERVED_WORDS
            .iter()
            .filter(|(name, _)| rest.starts_with(name))
            .max_by_key(|(name, _)| name.len())
            .map(|(name, r)| (name.len(), Some(*r)));
        let variable = variables
            .iter()
            .filter(|v| !v.is_empty() && rest.starts_with(v.as_str()))
            .max_by_key(|v| v.len())
            .map(|v| (v.len(), None::<Reserved>));

        let (len, kind) = match (reserved, variable) {
            (Some(r), Some(v)) if v.0 > r.0 => v,
            (Some(r), _) => r,
            (None, Some(v)) => v,
            (None, None) => return Err(ParseError::UnknownSymbol(word.to_string())),
        };

        let id = match kind {
            Some(Reserved::Constant(c)) => ctx.constant(c),
            Some(Reserved::Theta) | None => ctx.var(&rest[..len]),
        };
        factors.push(id);
        rest = &rest[len..];
    }

    let mut iter = factors.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| ParseError::UnknownSymbol(word.to_string()))?;
    Ok(iter.fold(first, |acc, f| ctx.add(Expr::Mul(acc, f))))
}

/// Convert a decimal string to BigRational.
/// "8.2" → 41/5, ".5" → 1/2, "8." → 8, "123" → 123
fn decimal_to_rational(integer_part: &str, fractional_part: &str) -> BigRational {
    let int_val: BigInt = if integer_part.is_empty() {
        BigInt::from(0)
    } else {
        integer_part.parse().unwrap_or_else(|_| BigInt::from(0))
    };

    if fractional_part.is_empty() {
        return BigRational::from_integer(int_val);
    }

    let denominator = num_traits::pow(BigInt::from(10), fractional_part.len());
    let frac_val: BigInt = fractional_part.parse().unwrap_or_else(|_| BigInt::from(0));

    // BigRational::new reduces the fraction
    BigRational::new(int_val * &denominator + frac_val, denominator)
}

// Parser for numeric literals: integers, decimals and a lowercase `e`
// exponent (`E` stays Euler's number, so `2E` is still a product)
fn parse_number(input: &str) -> IResult<&str, ParseNode> {
    fn is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    let (remaining, (int_part, maybe_frac)) = pair(
        take_while(is_digit),
        opt(preceded(tag("."), take_while(is_digit))),
    )(input)?;

    let frac_part = maybe_frac.unwrap_or("");
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }

    let (remaining, exponent) = opt(preceded(
        char('e'),
        recognize(pair(opt(one_of("+-")), digit1)),
    ))(remaining)?;

    let mut value = decimal_to_rational(int_part, frac_part);
    if let Some(exponent) = exponent {
        let power = exponent
            .parse::<i64>()
            .ok()
            .and_then(|e| u32::try_from(e.unsigned_abs()).ok())
            .filter(|p| *p <= MAX_DECIMAL_EXPONENT)
            .ok_or_else(|| {
                nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::TooLarge,
                ))
            })?;
        let scale = BigRational::from_integer(num_traits::pow(BigInt::from(10), power as usize));
        if exponent.starts_with('-') {
            value /= scale;
        } else {
            value *= scale;
        }
    }

    Ok((remaining, ParseNode::Number(value)))
}

// Letter run, or a function call when the run ends in a known function name
// directly followed by '('. Letters before the name are returned on their own
// so the implicit product chain picks up the call next: xsin(x) → x*sin(x).
fn parse_word(input: &str) -> IResult<&str, ParseNode> {
    let (rest, word) = alpha1(input)?;

    if rest.starts_with('(') {
        let function = FUNCTION_NAMES
            .iter()
            .filter(|name| word.ends_with(*name))
            .max_by_key(|name| name.len());

        if let Some(name) = function {
            let split = word.len() - name.len();
            if split > 0 {
                return Ok((&input[split..], ParseNode::Word(word[..split].to_string())));
            }
            let (rest, args) = delimited(
                char('('),
                separated_list1(preceded(multispace0, char(',')), parse_expr),
                preceded(multispace0, char(')')),
            )(rest)?;
            return Ok((rest, ParseNode::Function(name.to_string(), args)));
        }
    }

    Ok((rest, ParseNode::Word(word.to_string())))
}

// Parser for parentheses
fn parse_parens(input: &str) -> IResult<&str, ParseNode> {
    delimited(char('('), parse_expr, preceded(multispace0, char(')')))(input)
}

// Braces left over from macros the translator does not know group like parens
fn parse_braces(input: &str) -> IResult<&str, ParseNode> {
    delimited(char('{'), parse_expr, preceded(multispace0, char('}')))(input)
}

// Atom
fn parse_atom(input: &str) -> IResult<&str, ParseNode> {
    preceded(
        multispace0,
        alt((parse_number, parse_word, parse_parens, parse_braces)),
    )(input)
}

// Power - right associative: 2^3^4 = 2^(3^4). Both `^` and `**` are accepted.
fn parse_power(input: &str) -> IResult<&str, ParseNode> {
    let (input, base) = parse_atom(input)?;

    let op: IResult<&str, &str> = preceded(multispace0, alt((tag("**"), tag("^"))))(input);

    match op {
        Ok((input, _)) => {
            let (input, exp) = parse_power_exponent(input)?;
            Ok((input, ParseNode::Pow(Box::new(base), Box::new(exp))))
        }
        Err(_) => Ok((input, base)),
    }
}

// Exponents may carry a sign: x^-2, x^-(a+b)
fn parse_power_exponent(input: &str) -> IResult<&str, ParseNode> {
    preceded(
        multispace0,
        alt((
            map(preceded(char('-'), parse_power_exponent), |expr| {
                ParseNode::Neg(Box::new(expr))
            }),
            preceded(char('+'), parse_power_exponent),
            parse_power,
        )),
    )(input)
}

// Unary
fn parse_unary(input: &str) -> IResult<&str, ParseNode> {
    alt((
        map(preceded(pair(multispace0, char('-')), parse_unary), |expr| {
            ParseNode::Neg(Box::new(expr))
        }),
        preceded(pair(multispace0, char('+')), parse_unary),
        parse_power,
    ))(input)
}

#[derive(Debug, Clone, Copy)]
enum MulOp {
    Mul,
    Div,
}

fn parse_mul_op(input: &str) -> IResult<&str, MulOp> {
    preceded(
        multispace0,
        alt((
            map(terminated(char('*'), not(char('*'))), |_| MulOp::Mul),
            map(char('/'), |_| MulOp::Div),
        )),
    )(input)
}

// A factor written directly after the previous one: 2x, 3(x+1), (x+1)(x-1), xsin(x)
fn parse_implicit_factor(input: &str) -> IResult<&str, ParseNode> {
    let (input, _) = peek(satisfy(|c| c.is_ascii_alphabetic() || c == '(' || c == '{'))(input)?;
    parse_power(input)
}

// Term - explicit * and / interleaved with implicit multiplication
fn parse_term(input: &str) -> IResult<&str, ParseNode> {
    let (input, init) = parse_unary(input)?;

    fold_many0(
        alt((
            pair(parse_mul_op, parse_unary),
            map(parse_implicit_factor, |f| (MulOp::Mul, f)),
        )),
        move || init.clone(),
        |acc, (op, val)| match op {
            MulOp::Mul => ParseNode::Mul(Box::new(acc), Box::new(val)),
            MulOp::Div => ParseNode::Div(Box::new(acc), Box::new(val)),
        },
    )(input)
}

// Expr
fn parse_expr(input: &str) -> IResult<&str, ParseNode> {
    let (input, init) = parse_term(input)?;
    fold_many0(
        pair(preceded(multispace0, one_of("+-")), parse_term),
        move || init.clone(),
        |acc, (op, val)| match op {
            '+' => ParseNode::Add(Box::new(acc), Box::new(val)),
            _ => ParseNode::Sub(Box::new(acc), Box::new(val)),
        },
    )(input)
}

fn check_limits(input: &str) -> Result<(), ParseError> {
    if input.len() > MAX_INPUT_LEN {
        return Err(ParseError::NomError(format!(
            "input longer than {} bytes",
            MAX_INPUT_LEN
        )));
    }

    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut sign_run = 0usize;
    let mut max_sign_run = 0usize;
    let mut powers = input.matches("**").count();
    for c in input.chars() {
        match c {
            '(' | '{' => depth += 1,
            ')' | '}' => depth = depth.saturating_sub(1),
            '^' => powers += 1,
            _ => {}
        }
        if c == '-' || c == '+' {
            sign_run += 1;
        } else {
            sign_run = 0;
        }
        max_depth = max_depth.max(depth);
        max_sign_run = max_sign_run.max(sign_run);
    }

    if max_depth > MAX_NESTING || max_sign_run > MAX_NESTING || powers > MAX_NESTING {
        return Err(ParseError::NomError("expression nested too deeply".to_string()));
    }
    Ok(())
}

/// Parse flat algebraic syntax over the given variable alphabet.
pub fn parse(input: &str, ctx: &mut Context, variables: &[String]) -> Result<ExprId, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    check_limits(input)?;

    let (remaining, node) =
        parse_expr(input).map_err(|e| ParseError::NomError(format!("{}", e)))?;

    let remaining = remaining.trim();
    if !remaining.is_empty() {
        return Err(ParseError::UnconsumedInput(remaining.to_string()));
    }

    node.lower(ctx, variables)
}

/// Translate typeset-math macros, then parse the result.
pub fn parse_latex(
    latex: &str,
    ctx: &mut Context,
    variables: &[String],
) -> Result<ExprId, ParseError> {
    let bare = latex.trim().trim_matches('$');
    let flat = translate_macros(bare);
    parse(&flat, ctx, variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqv_ast::DisplayExpr;

    fn alphabet() -> Vec<String> {
        DEFAULT_VARIABLES.iter().map(|s| s.to_string()).collect()
    }

    fn show(input: &str) -> String {
        let mut ctx = Context::new();
        let e = parse(input, &mut ctx, &alphabet()).unwrap();
        format!(
            "{}",
            DisplayExpr {
                context: &ctx,
                id: e
            }
        )
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(show("123"), "123");
    }

    #[test]
    fn test_parse_decimal_literals() {
        let cases = [("8.2", "41/5"), ("0.5", "1/2"), (".5", "1/2"), ("8.", "8")];
        for (input, expected) in cases {
            assert_eq!(show(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_parse_scientific_literals() {
        let cases = [
            ("1e5", "100000"),
            ("2.5e-3", "1/400"),
            ("1.5e+2", "150"),
            ("3e0", "3"),
        ];
        for (input, expected) in cases {
            assert_eq!(show(input), expected, "input: {}", input);
        }
        assert_eq!(show("2E"), "2 * E");
        assert!(parse("1e99999", &mut Context::new(), &alphabet()).is_err());
    }

    #[test]
    fn test_parse_arithmetic() {
        assert_eq!(show("1+2*3"), "1 + 2 * 3");
        assert_eq!(show("(1+2)*3"), "(1 + 2) * 3");
        assert_eq!(show("a-b-c"), "a - b - c");
    }

    #[test]
    fn test_power_right_associativity() {
        let mut ctx = Context::new();
        let e = parse("2^3^2", &mut ctx, &alphabet()).unwrap();
        if let Expr::Pow(b, exp) = ctx.get(e) {
            assert!(matches!(ctx.get(*b), Expr::Number(_)));
            assert!(matches!(ctx.get(*exp), Expr::Pow(_, _)));
        } else {
            panic!("Expected Pow for '2^3^2'");
        }
    }

    #[test]
    fn test_double_star_power() {
        assert_eq!(show("(8)**(1/(3))"), "8^(1 / 3)");
        assert_eq!(show("x**2*y"), "x^2 * y");
    }

    #[test]
    fn test_negative_exponent() {
        assert_eq!(show("x^-2"), "x^(-2)");
        assert_eq!(show("x^-(a+b)"), "x^(-(a + b))");
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(show("2x"), "2 * x");
        assert_eq!(show("3(a+b)"), "3 * (a + b)");
        assert_eq!(show("(x+1)(x-1)"), "(x + 1) * (x - 1)");
        assert_eq!(show("2x^2+2x+1"), "2 * x^2 + 2 * x + 1");
        assert_eq!(show("2*3x/4"), "2 * 3 * x / 4");
    }

    #[test]
    fn test_letter_runs_split_into_products() {
        assert_eq!(show("xy"), "x * y");
        assert_eq!(show("2pi"), "2 * pi");
        assert_eq!(show("api"), "a * pi");
        assert_eq!(show("theta"), "theta");
        assert_eq!(show("xsin(x)"), "x * sin(x)");
    }

    #[test]
    fn test_functions_and_aliases() {
        assert_eq!(show("ln(x)"), "log(x)");
        assert_eq!(show("log(8,2)"), "log(8, 2)");
        assert_eq!(show("sqrt(4)"), "sqrt(4)");
        assert_eq!(show("E^x"), "E^x");
        assert_eq!(show("oo"), "oo");
    }

    #[test]
    fn test_braces_group() {
        assert_eq!(show("{x+1}^2"), "(x + 1)^2");
    }

    #[test]
    fn test_unknown_symbols_are_rejected() {
        let mut ctx = Context::new();
        let vars = alphabet();
        assert!(matches!(
            parse("w+1", &mut ctx, &vars),
            Err(ParseError::UnknownSymbol(_))
        ));
        assert!(matches!(
            parse("not", &mut ctx, &vars),
            Err(ParseError::UnknownSymbol(_))
        ));
        assert!(matches!(
            parse("sin", &mut ctx, &vars),
            Err(ParseError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_custom_alphabet() {
        let mut ctx = Context::new();
        let vars = vec!["t".to_string()];
        assert!(parse("2t", &mut ctx, &vars).is_ok());
        assert!(parse("2x", &mut ctx, &vars).is_err());
    }

    #[test]
    fn test_rejected_syntax() {
        let mut ctx = Context::new();
        let vars = alphabet();
        for input in ["y=2x", "1+/-2", "\\alpha", "x+", "(x", "", "not math at all ???"] {
            assert!(parse(input, &mut ctx, &vars).is_err(), "input: {}", input);
        }
        assert!(matches!(
            parse("sin(x,y)", &mut ctx, &vars),
            Err(ParseError::InvalidArity { .. })
        ));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let mut ctx = Context::new();
        let input = format!("{}x{}", "(".repeat(100), ")".repeat(100));
        assert!(parse(&input, &mut ctx, &alphabet()).is_err());
    }

    #[test]
    fn test_parse_latex_translates_first() {
        let mut ctx = Context::new();
        let e = parse_latex("\\frac{1}{2}+\\sqrt{x}", &mut ctx, &alphabet()).unwrap();
        assert_eq!(
            DisplayExpr {
                context: &ctx,
                id: e
            }
            .to_string(),
            "1 / 2 + sqrt(x)"
        );
        assert!(parse_latex("1\\pm2", &mut ctx, &alphabet()).is_err());
    }
}
