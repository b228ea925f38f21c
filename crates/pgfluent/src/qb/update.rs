//! UPDATE builder.

use super::single::SingleBuilder;
use super::traits::impl_filter;
use super::Pending;
use crate::backend::Backend;
use crate::descriptor::Query;
use crate::response::{self, Response};
use crate::row::Record;
use futures_util::future::BoxFuture;
use std::future::IntoFuture;

/// A pending UPDATE ... RETURNING over the filtered rows.
#[derive(Debug)]
#[must_use = "builders do nothing until awaited"]
pub struct UpdateBuilder<'a, B> {
    inner: Pending<'a, B>,
}

impl_filter!(UpdateBuilder);

impl<'a, B: Backend> UpdateBuilder<'a, B> {
    pub(crate) fn new(inner: Pending<'a, B>) -> Self {
        Self { inner }
    }

    /// Columns to return (default `*`).
    pub fn select(mut self, columns: &str) -> Self {
        self.inner.returning(columns);
        self
    }

    /// Resolve to the first updated row.
    pub fn single(self) -> SingleBuilder<'a, B> {
        SingleBuilder::new(self.inner)
    }

    pub fn query(&self) -> &Query {
        self.inner.query()
    }
}

impl<'a, B: Backend> IntoFuture for UpdateBuilder<'a, B> {
    type Output = Response<Vec<Record>>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { response::many(self.inner.execute().await) })
    }
}
