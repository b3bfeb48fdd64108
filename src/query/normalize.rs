//! Expression normalization
//!
//! Every term becomes a [`Condition`]: an optional equality target, an
//! optional `in` list and a pair of range bounds. Negated operators (`!=`,
//! `not in`) are split into a separate condition that joins the exclude side.

use std::ops::Bound;

use crate::index::{IndexError, IndexResult};
use crate::value::Value;

use super::expr::{Expr, Filter, Operand};

/// Canonical operators
pub const OPERATORS: [&str; 8] = ["==", "!=", "in", "not in", "<", "<=", ">", ">="];

/// Map an operator or alias to its canonical form
pub fn canonical_operator(op: &str) -> Option<&'static str> {
    let canonical = match op {
        "==" | "eq" => "==",
        "!=" | "ne" => "!=",
        "in" => "in",
        "not in" => "not in",
        "<" | "lt" => "<",
        "<=" | "le" | "lte" => "<=",
        ">" | "gt" => ">",
        ">=" | "ge" | "gte" => ">=",
        _ => return None,
    };
    Some(canonical)
}

/// Equality target
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Any value at all
    Any,
    /// Exactly this value
    Value(Value),
}

/// One attribute's normalized constraint. All parts must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub equals: Option<Target>,
    pub within: Option<Vec<Value>>,
    pub lower: Bound<Value>,
    pub upper: Bound<Value>,
}

impl Condition {
    fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            equals: None,
            within: None,
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Returns true if a range lookup is needed
    pub fn has_range(&self) -> bool {
        !matches!((&self.lower, &self.upper), (Bound::Unbounded, Bound::Unbounded))
    }

    fn is_empty(&self) -> bool {
        self.equals.is_none() && self.within.is_none() && !self.has_range()
    }
}

/// Normalized match and exclude conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    pub matches: Vec<Condition>,
    pub excludes: Vec<Condition>,
}

impl QueryPlan {
    /// Plan a `find(match, exclude)` call.
    ///
    /// Negated operators under `match` move to the exclude side; under
    /// `exclude` they are rejected.
    pub fn from_find(matching: &Filter, excluding: &Filter) -> IndexResult<Self> {
        let mut plan = QueryPlan::default();
        for (attribute, expr) in matching.terms() {
            let (positive, negated) = normalize(attribute, expr)?;
            plan.matches.extend(positive);
            plan.excludes.extend(negated);
        }
        for (attribute, expr) in excluding.terms() {
            let (positive, negated) = normalize(attribute, expr)?;
            if negated.is_some() {
                return Err(IndexError::invalid_expression(
                    attribute,
                    "'!=' and 'not in' cannot be used inside exclude",
                ));
            }
            plan.excludes.extend(positive);
        }
        Ok(plan)
    }

    /// Plan a combined query: negated operators become exclude terms.
    pub fn from_query(filter: &Filter) -> IndexResult<Self> {
        Self::from_find(filter, &Filter::new())
    }
}

/// Normalize one term into its positive and negated conditions.
pub fn normalize(attribute: &str, expr: &Expr) -> IndexResult<(Option<Condition>, Option<Condition>)> {
    let mut positive = Condition::new(attribute);
    match expr {
        Expr::Any => positive.equals = Some(Target::Any),
        Expr::Value(v) => positive.equals = Some(Target::Value(v.clone())),
        Expr::List(vs) => positive.within = Some(vs.clone()),
        Expr::Ops(ops) => return normalize_ops(attribute, ops),
    }
    Ok((Some(positive), None))
}

fn normalize_ops(
    attribute: &str,
    ops: &[(String, Operand)],
) -> IndexResult<(Option<Condition>, Option<Condition>)> {
    if ops.is_empty() {
        return Err(IndexError::invalid_expression(attribute, "empty operator map"));
    }
    let mut positive = Condition::new(attribute);
    let mut negated = Condition::new(attribute);
    let mut seen: Vec<&'static str> = Vec::with_capacity(ops.len());

    for (raw, operand) in ops {
        let op = canonical_operator(raw).ok_or_else(|| {
            IndexError::invalid_expression(
                attribute,
                format!("invalid operator '{}'; expected one of {:?}", raw, OPERATORS),
            )
        })?;
        if seen.contains(&op) {
            return Err(IndexError::invalid_expression(
                attribute,
                format!("operator '{}' given more than once", op),
            ));
        }
        for (a, b) in [("<", "<="), (">", ">=")] {
            if (op == a && seen.contains(&b)) || (op == b && seen.contains(&a)) {
                return Err(IndexError::invalid_expression(
                    attribute,
                    format!("either '{}' or '{}' may be used, not both", a, b),
                ));
            }
        }
        seen.push(op);

        match op {
            "==" => positive.equals = Some(target(attribute, op, operand)?),
            "!=" => negated.equals = Some(target(attribute, op, operand)?),
            "in" => positive.within = Some(list(attribute, op, operand)?),
            "not in" => negated.within = Some(list(attribute, op, operand)?),
            "<" => positive.upper = Bound::Excluded(bound(attribute, op, operand)?),
            "<=" => positive.upper = Bound::Included(bound(attribute, op, operand)?),
            ">" => positive.lower = Bound::Excluded(bound(attribute, op, operand)?),
            _ => positive.lower = Bound::Included(bound(attribute, op, operand)?),
        }
    }

    let positive = (!positive.is_empty()).then_some(positive);
    let negated = (!negated.is_empty()).then_some(negated);
    Ok((positive, negated))
}

fn target(attribute: &str, op: &str, operand: &Operand) -> IndexResult<Target> {
    match operand {
        Operand::Any => Ok(Target::Any),
        Operand::Value(v) => Ok(Target::Value(v.clone())),
        Operand::List(_) => Err(IndexError::invalid_expression(
            attribute,
            format!("'{}' takes a single value; use 'in' for lists", op),
        )),
    }
}

fn list(attribute: &str, op: &str, operand: &Operand) -> IndexResult<Vec<Value>> {
    match operand {
        Operand::List(vs) => Ok(vs.clone()),
        _ => Err(IndexError::invalid_expression(
            attribute,
            format!("'{}' takes a list of values", op),
        )),
    }
}

fn bound(attribute: &str, op: &str, operand: &Operand) -> IndexResult<Value> {
    match operand {
        Operand::Value(Value::Null) => Err(IndexError::incomparable(
            attribute,
            format!("null cannot be used as a '{}' bound", op),
        )),
        Operand::Value(v) => Ok(v.clone()),
        _ => Err(IndexError::invalid_expression(
            attribute,
            format!("'{}' takes a single value", op),
        )),
    }
}
