//! Query expressions
//!
//! An [`Expr`] constrains one attribute. A [`Filter`] is a list of
//! `(attribute, expr)` terms that must all hold.
//!
//! ```ignore
//! use attrdex::query::{Expr, Filter, ANY};
//!
//! let filter = Filter::new()
//!     .with("name", vec!["Pikachu", "Eevee"])
//!     .with("level", Expr::ops([(">", 6), ("<=", 8)]))
//!     .with("trainer", ANY);
//! ```

use crate::value::{CustomValue, Value};

/// Sentinel meaning "has this attribute at all".
///
/// Distinct from every [`Value`], `Null` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Any;

/// The ANY sentinel
pub const ANY: Any = Any;

/// Right-hand side of one operator
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// The ANY sentinel
    Any,
    /// A single value
    Value(Value),
    /// A list of values, for `in` / `not in`
    List(Vec<Value>),
}

/// Constraint on one attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Has the attribute; shorthand for `{"==": ANY}`
    Any,
    /// Equals the value; shorthand for `{"==": value}`
    Value(Value),
    /// Equals any listed value; shorthand for `{"in": [...]}`
    List(Vec<Value>),
    /// Operator map such as `{">": 6, "<=": 8}`
    Ops(Vec<(String, Operand)>),
}

impl Expr {
    /// Build an operator map
    pub fn ops<I, K, O>(ops: I) -> Self
    where
        I: IntoIterator<Item = (K, O)>,
        K: Into<String>,
        O: Into<Operand>,
    {
        Expr::Ops(ops.into_iter().map(|(k, o)| (k.into(), o.into())).collect())
    }

    /// Single-operator map
    pub fn op(operator: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Expr::Ops(vec![(operator.into(), operand.into())])
    }

    /// Add another operator to this expression, turning a shorthand into
    /// its operator-map form first.
    pub fn and(self, operator: impl Into<String>, operand: impl Into<Operand>) -> Self {
        let mut ops = match self {
            Expr::Any => vec![("==".to_string(), Operand::Any)],
            Expr::Value(v) => vec![("==".to_string(), Operand::Value(v))],
            Expr::List(vs) => vec![("in".to_string(), Operand::List(vs))],
            Expr::Ops(ops) => ops,
        };
        ops.push((operator.into(), operand.into()));
        Expr::Ops(ops)
    }
}

macro_rules! scalar_conversions {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Operand::Value(Value::from(v))
                }
            }

            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    Expr::Value(Value::from(v))
                }
            }
        )*
    };
}

scalar_conversions!(i8, i16, i32, i64, u8, u16, u32, bool, f32, f64, &str, String, &String, CustomValue);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Value(v)
    }
}

impl From<Any> for Operand {
    fn from(_: Any) -> Self {
        Operand::Any
    }
}

impl From<Any> for Expr {
    fn from(_: Any) -> Self {
        Expr::Any
    }
}

impl<V: Into<Value>> From<Vec<V>> for Operand {
    fn from(vs: Vec<V>) -> Self {
        Operand::List(vs.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<Vec<V>> for Expr {
    fn from(vs: Vec<V>) -> Self {
        Expr::List(vs.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Operand {
    fn from(vs: [V; N]) -> Self {
        Operand::List(vs.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Expr {
    fn from(vs: [V; N]) -> Self {
        Expr::List(vs.into_iter().map(Into::into).collect())
    }
}

/// Conjunction of `(attribute, expr)` terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    terms: Vec<(String, Expr)>,
}

impl Filter {
    /// Empty filter; matches everything, excludes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term
    pub fn with(mut self, attribute: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.push(attribute, expr);
        self
    }

    /// Add a term in place
    pub fn push(&mut self, attribute: impl Into<String>, expr: impl Into<Expr>) {
        self.terms.push((attribute.into(), expr.into()));
    }

    /// Terms in insertion order
    pub fn terms(&self) -> &[(String, Expr)] {
        &self.terms
    }

    /// Attribute names referenced
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(name, _)| name.as_str())
    }

    /// Returns true if there are no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

impl<K: Into<String>, E: Into<Expr>> FromIterator<(K, E)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, E)>>(iter: I) -> Self {
        Filter {
            terms: iter.into_iter().map(|(k, e)| (k.into(), e.into())).collect(),
        }
    }
}

impl<K: Into<String>, E: Into<Expr>, const N: usize> From<[(K, E); N]> for Filter {
    fn from(terms: [(K, E); N]) -> Self {
        terms.into_iter().collect()
    }
}
