//! Execution backends.
//!
//! A [`Backend`] takes a finished [`Query`] and runs it: [`SqlBackend`]
//! compiles it to SQL for a [`GenericClient`](crate::GenericClient),
//! [`HttpBackend`] compiles it to a REST request for a [`Transport`].

mod http;
mod postgres;

pub use http::{HttpBackend, HttpReply, Transport};
pub use postgres::SqlBackend;

#[cfg(feature = "http")]
pub use http::ReqwestTransport;

use crate::descriptor::Query;
use crate::error::OrmResult;
use crate::row::Record;
use crate::session::Session;

/// What a backend hands back before normalization into a [`Response`](crate::Response).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Returned rows; `None` when the operation produced none (DELETE, head-only count).
    pub rows: Option<Vec<Record>>,
    pub count: Option<i64>,
}

impl Outcome {
    pub fn rows(rows: Vec<Record>) -> Self {
        Self {
            rows: Some(rows),
            count: None,
        }
    }
}

/// Runs one compiled query per call.
pub trait Backend: Send + Sync {
    /// Compile and execute `query`.
    fn run(&self, query: Query) -> impl std::future::Future<Output = OrmResult<Outcome>> + Send;

    /// The session requests are made on behalf of, if any.
    fn session(&self) -> Option<&Session> {
        None
    }
}

impl<B: Backend> Backend for std::sync::Arc<B> {
    fn run(&self, query: Query) -> impl std::future::Future<Output = OrmResult<Outcome>> + Send {
        (**self).run(query)
    }

    fn session(&self) -> Option<&Session> {
        (**self).session()
    }
}

pub(crate) fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::truncate_bytes;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_bytes("SELECT * FROM t", 8), "SELECT *");
        assert_eq!(truncate_bytes("é", 1), "");
    }
}
