pub mod display;
pub mod expression;
pub mod visitor;

pub use display::DisplayExpr;
pub use expression::{Constant, Context, Expr, ExprId};
pub use visitor::{VariableCollector, Visitor};
