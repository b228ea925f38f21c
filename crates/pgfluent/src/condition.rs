//! Filter predicates.
//!
//! A [`Condition`] is one `column <operator> value` predicate. Builders keep an
//! ordered list of them and every backend AND-joins the list in append order.

use crate::error::{OrmError, OrmResult};
use serde_json::Value;
use std::fmt;

/// Comparison operator of a [`Condition`].
///
/// # Example
/// ```ignore
/// use pgfluent::{Condition, Operator};
///
/// Condition::new("status", Operator::Eq, "paid");
/// Condition::new("due_on", Operator::Lt, "2024-01-31");
/// Condition::new("voided_at", Operator::Is, serde_json::Value::Null);
/// Condition::new("status", Operator::Not(Box::new(Operator::Eq)), "draft");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    /// column = value
    Eq,
    /// column <> value
    Neq,
    /// column > value
    Gt,
    /// column >= value
    Gte,
    /// column < value
    Lt,
    /// column <= value
    Lte,
    /// LIKE pattern match
    Like,
    /// Case-insensitive LIKE (PostgreSQL ILIKE)
    Ilike,
    /// IS NULL / IS TRUE / IS FALSE
    Is,
    /// IS NOT NULL / IS NOT TRUE / IS NOT FALSE
    IsNot,
    /// IN (list)
    In,
    /// Negation of another operator
    Not(Box<Operator>),
}

impl Operator {
    /// Short name used in HTTP query parameters (`column__<name>=value`).
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::Is => "is",
            Operator::IsNot => "is_not",
            Operator::In => "in",
            Operator::Not(_) => "not",
        }
    }

    /// Parse a short operator name (`"eq"`, `"ilike"`, `"is_not"`, ...).
    ///
    /// `"not"` cannot be parsed on its own since it needs an inner operator.
    pub fn parse(name: &str) -> OrmResult<Self> {
        Ok(match name {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "ilike" => Operator::Ilike,
            "is" => Operator::Is,
            "is_not" => Operator::IsNot,
            "in" => Operator::In,
            other => {
                return Err(OrmError::validation(format!(
                    "Unknown filter operator '{other}'"
                )));
            }
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Not(inner) => write!(f, "not.{inner}"),
            other => f.write_str(other.name()),
        }
    }
}

/// A single filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    /// Create a condition. Shape rules are checked by [`Condition::validate`].
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Check the operator/value invariants.
    ///
    /// - `In` needs an array.
    /// - `Is`/`IsNot` need `null`, `true` or `false`.
    /// - `Not` cannot wrap another `Not`.
    pub fn validate(&self) -> OrmResult<()> {
        check_shape(&self.column, &self.operator, &self.value)
    }

    /// The list of elements of an `In` condition.
    pub(crate) fn list(&self) -> &[Value] {
        match &self.value {
            Value::Array(items) => items,
            _ => &[],
        }
    }
}

fn check_shape(column: &str, operator: &Operator, value: &Value) -> OrmResult<()> {
    match operator {
        Operator::In if !value.is_array() => Err(OrmError::validation(format!(
            "IN filter on '{column}' requires a list, got {value}"
        ))),
        Operator::Is | Operator::IsNot if !matches!(value, Value::Null | Value::Bool(_)) => {
            Err(OrmError::validation(format!(
                "IS filter on '{column}' accepts only null, true or false, got {value}"
            )))
        }
        Operator::Not(inner) => match inner.as_ref() {
            Operator::Not(_) => Err(OrmError::validation(format!(
                "Double negation on '{column}' is not supported"
            ))),
            inner => check_shape(column, inner, value),
        },
        _ => Ok(()),
    }
}
