//! Single-row builder returned by `.single()`.

use super::Pending;
use crate::backend::Backend;
use crate::descriptor::{Direction, Operation, Order, Query};
use crate::error::OrmError;
use crate::response::{self, Response};
use crate::row::Record;
use futures_util::future::BoxFuture;
use std::future::IntoFuture;

/// Resolves to the first row, or `data: None` when there is none.
///
/// Only projection and ordering can still be refined; filters are not
/// available after `.single()`.
///
/// ```ignore
/// let latest = db
///     .from("invoices")
///     .select("*")
///     .eq("customer_id", 3)
///     .single()
///     .order("issued_on", Direction::Desc)
///     .await;
///
/// let created = db.from("contacts").insert(row).single().select("id").await;
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until awaited"]
pub struct SingleBuilder<'a, B> {
    inner: Pending<'a, B>,
}

impl<'a, B: Backend> SingleBuilder<'a, B> {
    pub(crate) fn new(inner: Pending<'a, B>) -> Self {
        Self { inner }
    }

    /// Projection of a SELECT, or the `RETURNING` list of a mutation.
    pub fn select(mut self, columns: &str) -> Self {
        self.inner.returning(columns);
        self
    }

    /// `ORDER BY column ASC|DESC`, picking which row comes first.
    ///
    /// Mutations have no ordering; calling this on one fails when awaited.
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        let kind = match &mut self.inner.query_mut().operation {
            Operation::Select(spec) => {
                spec.order = Some(Order {
                    column: column.to_string(),
                    direction,
                });
                return self;
            }
            other => other.kind(),
        };
        self.inner = self.inner.with_error(Some(OrmError::validation(format!(
            "order() only applies to select, not {kind}"
        ))));
        self
    }

    pub fn query(&self) -> &Query {
        self.inner.query()
    }
}

impl<'a, B: Backend> IntoFuture for SingleBuilder<'a, B> {
    type Output = Response<Record>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { response::one(self.inner.execute().await) })
    }
}
