//! DELETE builder.

use super::traits::impl_filter;
use super::Pending;
use crate::backend::Backend;
use crate::descriptor::Query;
use crate::response::{self, Response};
use crate::row::Record;
use futures_util::future::BoxFuture;
use std::future::IntoFuture;

/// A pending DELETE over the filtered rows. Resolves with `data: None`.
#[derive(Debug)]
#[must_use = "builders do nothing until awaited"]
pub struct DeleteBuilder<'a, B> {
    inner: Pending<'a, B>,
}

impl_filter!(DeleteBuilder);

impl<'a, B: Backend> DeleteBuilder<'a, B> {
    pub(crate) fn new(inner: Pending<'a, B>) -> Self {
        Self { inner }
    }

    pub fn query(&self) -> &Query {
        self.inner.query()
    }
}

impl<'a, B: Backend> IntoFuture for DeleteBuilder<'a, B> {
    type Output = Response<Vec<Record>>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { response::empty(self.inner.execute().await) })
    }
}
