//! Filter methods shared by the SELECT, UPDATE and DELETE builders.

use crate::condition::{Condition, Operator};
use serde_json::Value;

/// Appends `column <operator> value` predicates, AND-joined in call order.
///
/// # Example
/// ```ignore
/// use pgfluent::prelude::*;
///
/// db.from("invoices")
///     .select("*")
///     .eq("status", "paid")
///     .gte("total", 100)
///     .is("voided_at", Value::Null)
///     .in_list("currency", ["EUR", "USD"])
///     .not("customer_id", Operator::Eq, 3)
///     .await;
/// ```
pub trait Filter: Sized {
    /// Append one condition.
    fn push_condition(&mut self, condition: Condition);

    /// Generic form: `column <operator> value`.
    fn filter(mut self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.push_condition(Condition::new(column, operator, value));
        self
    }

    /// column = value
    fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    /// column != value
    fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Neq, value)
    }

    /// column > value
    fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Gt, value)
    }

    /// column >= value
    fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Gte, value)
    }

    /// column < value
    fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Lt, value)
    }

    /// column <= value
    fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Lte, value)
    }

    /// column LIKE pattern
    fn like(self, column: &str, pattern: impl Into<String>) -> Self {
        self.filter(column, Operator::Like, pattern.into())
    }

    /// column ILIKE pattern
    fn ilike(self, column: &str, pattern: impl Into<String>) -> Self {
        self.filter(column, Operator::Ilike, pattern.into())
    }

    /// column IS NULL / TRUE / FALSE
    fn is(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Is, value)
    }

    /// column IS NOT NULL / TRUE / FALSE
    fn is_not(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::IsNot, value)
    }

    /// column IN (values)
    fn in_list<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(column, Operator::In, Value::Array(list))
    }

    /// Negate `operator`: `not("status", Operator::Eq, "draft")`.
    fn not(self, column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Not(Box::new(operator)), value)
    }
}

/// Implement [`Filter`] for a builder wrapping a `Pending` in field `inner`.
macro_rules! impl_filter {
    ($builder:ident) => {
        impl<'a, B: $crate::backend::Backend> $crate::qb::Filter for $builder<'a, B> {
            fn push_condition(&mut self, condition: $crate::condition::Condition) {
                self.inner.query_mut().conditions.push(condition);
            }
        }
    };
}

pub(crate) use impl_filter;
