//! SELECT builder.

use super::single::SingleBuilder;
use super::traits::impl_filter;
use super::Pending;
use crate::backend::Backend;
use crate::descriptor::{Direction, Operation, Order, Query, SelectSpec};
use crate::response::{self, Response};
use crate::row::Record;
use futures_util::future::BoxFuture;
use std::future::IntoFuture;

/// A pending SELECT. Await it to run.
#[derive(Debug)]
#[must_use = "builders do nothing until awaited"]
pub struct SelectBuilder<'a, B> {
    inner: Pending<'a, B>,
}

impl_filter!(SelectBuilder);

impl<'a, B: Backend> SelectBuilder<'a, B> {
    pub(crate) fn new(inner: Pending<'a, B>) -> Self {
        Self { inner }
    }

    fn with_spec(mut self, f: impl FnOnce(&mut SelectSpec)) -> Self {
        if let Operation::Select(spec) = &mut self.inner.query_mut().operation {
            f(spec);
        }
        self
    }

    /// `ORDER BY column ASC|DESC`. Calling it again replaces the ordering.
    pub fn order(self, column: &str, direction: Direction) -> Self {
        self.with_spec(|spec| {
            spec.order = Some(Order {
                column: column.to_string(),
                direction,
            })
        })
    }

    /// Cap the number of returned rows.
    pub fn limit(self, n: u64) -> Self {
        self.with_spec(|spec| spec.limit = Some(n))
    }

    /// Expect one row: `LIMIT 1`, resolving to the row or `None`.
    pub fn single(self) -> SingleBuilder<'a, B> {
        SingleBuilder::new(self.with_spec(|spec| spec.single = true).inner)
    }

    /// The descriptor accumulated so far.
    pub fn query(&self) -> &Query {
        self.inner.query()
    }
}

impl<'a, B: Backend> IntoFuture for SelectBuilder<'a, B> {
    type Output = Response<Vec<Record>>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { response::many(self.inner.execute().await) })
    }
}
