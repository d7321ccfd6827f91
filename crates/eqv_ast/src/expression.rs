use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Signed;
use std::collections::HashMap;

/// Handle to a node stored in a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Named mathematical constants recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    Pi,
    E,
    Infinity,
}

impl Constant {
    pub fn name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "E",
            Constant::Infinity => "oo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Number(BigRational),
    Constant(Constant),
    Variable(String),
    Add(ExprId, ExprId),
    Sub(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Div(ExprId, ExprId),
    Pow(ExprId, ExprId),
    Neg(ExprId),
    Function(String, Vec<ExprId>), // sin(x), log(x), log(x, b)
}

impl Expr {
    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) => Vec::new(),
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => vec![*l, *r],
            Expr::Neg(e) => vec![*e],
            Expr::Function(_, args) => args.clone(),
        }
    }
}

/// Hash-consed arena owning every node of one or more expression trees.
///
/// Structurally identical nodes share a single [`ExprId`], so id equality
/// implies structural equality. A `Context` is owned by exactly one parsed
/// answer and is never shared between comparisons.
#[derive(Debug, Default, Clone)]
pub struct Context {
    nodes: Vec<Expr>,
    interned: HashMap<Expr, ExprId>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, folding `Neg(Number(n))` into `Number(-n)`.
    pub fn add(&mut self, expr: Expr) -> ExprId {
        let expr = match expr {
            Expr::Neg(inner) => match self.get(inner) {
                Expr::Number(n) => Expr::Number(-n.clone()),
                _ => Expr::Neg(inner),
            },
            other => other,
        };
        self.add_raw(expr)
    }

    /// Insert a node exactly as given.
    pub fn add_raw(&mut self, expr: Expr) -> ExprId {
        if let Some(id) = self.interned.get(&expr) {
            return *id;
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr.clone());
        self.interned.insert(expr, id);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn num(&mut self, n: i64) -> ExprId {
        self.add(Expr::Number(BigRational::from_integer(BigInt::from(n))))
    }

    pub fn rational(&mut self, r: BigRational) -> ExprId {
        self.add(Expr::Number(r))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        self.add(Expr::Variable(name.to_string()))
    }

    pub fn constant(&mut self, c: Constant) -> ExprId {
        self.add(Expr::Constant(c))
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        self.add(Expr::Function(name.to_string(), args))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes reachable from `root`, counting shared nodes once per use.
    pub fn node_count(&self, root: ExprId) -> usize {
        1 + self
            .get(root)
            .children()
            .into_iter()
            .map(|c| self.node_count(c))
            .sum::<usize>()
    }

    /// Height of the tree rooted at `root`.
    pub fn depth(&self, root: ExprId) -> usize {
        1 + self
            .get(root)
            .children()
            .into_iter()
            .map(|c| self.depth(c))
            .max()
            .unwrap_or(0)
    }

    /// True when `id` is a literal negative number or an explicit negation.
    pub fn is_negative_literal(&self, id: ExprId) -> bool {
        match self.get(id) {
            Expr::Number(n) => n.is_negative(),
            Expr::Neg(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing_shares_ids() {
        let mut ctx = Context::new();
        let x1 = ctx.var("x");
        let x2 = ctx.var("x");
        assert_eq!(x1, x2);

        let one = ctx.num(1);
        let a = ctx.add(Expr::Add(x1, one));
        let b = ctx.add(Expr::Add(x2, one));
        assert_eq!(a, b);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_neg_number_is_folded() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let neg = ctx.add(Expr::Neg(two));
        assert_eq!(neg, ctx.num(-2));
        assert!(ctx.is_negative_literal(neg));
    }

    #[test]
    fn test_node_count_and_depth() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let pow = ctx.add(Expr::Pow(x, two));
        let sin = ctx.call("sin", vec![pow]);
        assert_eq!(ctx.node_count(sin), 4);
        assert_eq!(ctx.depth(sin), 3);
    }
}
