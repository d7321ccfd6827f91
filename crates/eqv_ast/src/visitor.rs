use crate::{Context, Expr, ExprId};
use std::collections::BTreeSet;

/// Pre-order walk over an expression tree.
///
/// `enter` sees every node before its children; returning `false` skips the
/// subtree below it.
pub trait Visitor {
    fn enter(&mut self, context: &Context, id: ExprId) -> bool;

    fn walk(&mut self, context: &Context, root: ExprId) {
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            if self.enter(context, id) {
                // reversed so the leftmost child is entered first
                pending.extend(context.get(id).children().into_iter().rev());
            }
        }
    }
}

/// Free variable names of an expression, sorted.
#[derive(Debug, Default)]
pub struct VariableCollector {
    pub vars: BTreeSet<String>,
}

impl VariableCollector {
    pub fn collect(context: &Context, root: ExprId) -> BTreeSet<String> {
        let mut collector = Self::default();
        collector.walk(context, root);
        collector.vars
    }
}

impl Visitor for VariableCollector {
    fn enter(&mut self, context: &Context, id: ExprId) -> bool {
        if let Expr::Variable(name) = context.get(id) {
            self.vars.insert(name.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constant;

    #[test]
    fn test_collects_variables_inside_calls() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let pi = ctx.constant(Constant::Pi);
        let sin = ctx.call("sin", vec![x]);
        let prod = ctx.add(Expr::Mul(pi, y));
        let root = ctx.add(Expr::Add(sin, prod));

        let vars = VariableCollector::collect(&ctx, root);
        assert_eq!(vars.into_iter().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_enter_can_prune() {
        struct Counter(usize);
        impl Visitor for Counter {
            fn enter(&mut self, context: &Context, id: ExprId) -> bool {
                self.0 += 1;
                !matches!(context.get(id), Expr::Function(_, _))
            }
        }

        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let sum = ctx.add(Expr::Add(x, two));
        let call = ctx.call("sqrt", vec![sum]);
        let root = ctx.add(Expr::Mul(call, x));

        let mut counter = Counter(0);
        counter.walk(&ctx, root);
        assert_eq!(counter.0, 3);
    }
}
