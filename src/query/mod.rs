//! Query expressions, normalization and evaluation
//!
//! # Forms
//!
//! - `find(match, exclude)`: objects satisfying every match term and no
//!   exclude term
//! - `query(filter)`: one filter; `!=` and `not in` become exclude terms
//!
//! # Operators
//!
//! `==`, `!=`, `in`, `not in`, `<`, `<=`, `>`, `>=` and the aliases `eq`,
//! `ne`, `lt`, `le`, `lte`, `gt`, `ge`, `gte`. A bare value means `==`, a
//! list means `in`, and [`ANY`] means "has this attribute".

mod evaluator;
mod expr;
mod normalize;

pub use evaluator::QueryEvaluator;
pub use expr::{Any, Expr, Filter, Operand, ANY};
pub use normalize::{canonical_operator, normalize, Condition, QueryPlan, Target, OPERATORS};
