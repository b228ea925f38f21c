//! Fluent query builders.
//!
//! Every chain starts at [`Db::from`](crate::Db::from), which returns a
//! [`TableRef`]. Picking an operation yields a typed builder; awaiting the
//! builder compiles and runs it exactly once and resolves to a
//! [`Response`](crate::Response).
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! // SELECT
//! let res = db
//!     .from("invoices")
//!     .select("id, total")
//!     .eq("status", "paid")
//!     .order("issued_on", Direction::Desc)
//!     .limit(20)
//!     .await;
//!
//! // INSERT ... RETURNING
//! let res = db.from("contacts").insert(json!({"name": "Ada"})).single().await;
//!
//! // UPDATE
//! let res = db.from("invoices").update(json!({"status": "void"})).eq("id", 7).await;
//!
//! // UPSERT
//! let res = db
//!     .from("contacts")
//!     .upsert(rows, UpsertOptions::on_conflict("email"))
//!     .await;
//!
//! // DELETE
//! let res = db.from("invoices").delete().eq("id", 7).await;
//! ```

mod delete;
mod insert;
mod select;
mod single;
mod traits;
mod update;
mod upsert;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::SelectBuilder;
pub use single::SingleBuilder;
pub use traits::Filter;
pub use update::UpdateBuilder;
pub use upsert::UpsertBuilder;

use crate::backend::{Backend, Outcome};
use crate::descriptor::{
    Count, InsertSpec, Operation, Payload, Query, SelectSpec, UpdateSpec, UpsertSpec,
};
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use serde::Serialize;
use serde_json::Value;

/// Options for [`TableRef::select_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    pub count: Option<Count>,
    /// Return only the count, no rows.
    pub head: bool,
}

impl SelectOptions {
    /// Ask for an exact row count alongside the rows.
    pub fn count(count: Count) -> Self {
        Self {
            count: Some(count),
            head: false,
        }
    }

    pub fn head(mut self, head: bool) -> Self {
        self.head = head;
        self
    }
}

/// Options for [`TableRef::upsert`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Conflict target, one column or a comma-separated list.
    pub on_conflict: Option<String>,
    /// `DO NOTHING` instead of updating the conflicting row.
    pub ignore_duplicates: bool,
}

impl UpsertOptions {
    pub fn on_conflict(columns: impl Into<String>) -> Self {
        Self {
            on_conflict: Some(columns.into()),
            ignore_duplicates: false,
        }
    }

    pub fn ignore_duplicates(mut self, ignore: bool) -> Self {
        self.ignore_duplicates = ignore;
        self
    }
}

/// A table handle: pick an operation to get a builder.
#[derive(Debug)]
pub struct TableRef<'a, B> {
    backend: &'a B,
    table: String,
}

impl<'a, B: Backend> TableRef<'a, B> {
    pub(crate) fn new(backend: &'a B, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    /// `SELECT <columns>`; `"*"` for all columns.
    pub fn select(self, columns: &str) -> SelectBuilder<'a, B> {
        self.select_with(columns, SelectOptions::default())
    }

    /// `SELECT` with a count request.
    pub fn select_with(self, columns: &str, options: SelectOptions) -> SelectBuilder<'a, B> {
        let spec = SelectSpec {
            projection: columns.to_string(),
            count: options.count,
            head: options.head,
            ..SelectSpec::default()
        };
        SelectBuilder::new(Pending::new(self.backend, self.table, Operation::Select(spec)))
    }

    /// Insert one row (a JSON object / struct) or many (an array).
    pub fn insert(self, rows: impl Serialize) -> InsertBuilder<'a, B> {
        let (rows, error) = to_payload(rows);
        let spec = InsertSpec {
            rows,
            returning: "*".to_string(),
        };
        InsertBuilder::new(
            Pending::new(self.backend, self.table, Operation::Insert(spec)).with_error(error),
        )
    }

    /// Update the filtered rows with `patch`.
    pub fn update(self, patch: impl Serialize) -> UpdateBuilder<'a, B> {
        let (patch, error) = match to_record(patch) {
            Ok(patch) => (patch, None),
            Err(e) => (Record::new(), Some(e)),
        };
        let spec = UpdateSpec {
            patch,
            returning: "*".to_string(),
        };
        UpdateBuilder::new(
            Pending::new(self.backend, self.table, Operation::Update(spec)).with_error(error),
        )
    }

    /// Insert, resolving conflicts on `options.on_conflict` (default: first column).
    pub fn upsert(self, rows: impl Serialize, options: UpsertOptions) -> UpsertBuilder<'a, B> {
        let (rows, error) = to_payload(rows);
        let spec = UpsertSpec {
            rows,
            on_conflict: options.on_conflict,
            ignore_duplicates: options.ignore_duplicates,
            returning: "*".to_string(),
        };
        UpsertBuilder::new(
            Pending::new(self.backend, self.table, Operation::Upsert(spec)).with_error(error),
        )
    }

    /// Delete the filtered rows.
    pub fn delete(self) -> DeleteBuilder<'a, B> {
        DeleteBuilder::new(Pending::new(self.backend, self.table, Operation::Delete))
    }
}

/// State shared by all builders: the backend, the descriptor, and the first
/// error hit while building (reported when awaited).
#[derive(Debug)]
pub(crate) struct Pending<'a, B> {
    backend: &'a B,
    query: Query,
    error: Option<OrmError>,
}

impl<'a, B: Backend> Pending<'a, B> {
    fn new(backend: &'a B, table: String, operation: Operation) -> Self {
        Self {
            backend,
            query: Query::new(table, operation),
            error: None,
        }
    }

    fn with_error(mut self, error: Option<OrmError>) -> Self {
        if self.error.is_none() {
            self.error = error;
        }
        self
    }

    pub(crate) fn query(&self) -> &Query {
        &self.query
    }

    pub(crate) fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Set the projection of a SELECT or the `RETURNING` list of a mutation.
    fn returning(&mut self, columns: &str) {
        match &mut self.query.operation {
            Operation::Insert(spec) => spec.returning = columns.to_string(),
            Operation::Update(spec) => spec.returning = columns.to_string(),
            Operation::Upsert(spec) => spec.returning = columns.to_string(),
            Operation::Select(spec) => spec.projection = columns.to_string(),
            Operation::Delete => {}
        }
    }

    /// Compile and run, short-circuiting build errors and empty inserts.
    pub(crate) async fn execute(self) -> OrmResult<Outcome> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.query.is_vacuous() {
            return Ok(Outcome::rows(Vec::new()));
        }
        self.backend.run(self.query).await
    }
}

fn to_payload(rows: impl Serialize) -> (Payload, Option<OrmError>) {
    match serde_json::to_value(rows)
        .map_err(OrmError::from)
        .and_then(Payload::from_value)
    {
        Ok(payload) => (payload, None),
        Err(e) => (Payload::Many(Vec::new()), Some(e)),
    }
}

fn to_record(patch: impl Serialize) -> OrmResult<Record> {
    match serde_json::to_value(patch)? {
        Value::Object(record) => Ok(record),
        other => Err(OrmError::validation(format!(
            "Update patch must be an object, got {other}"
        ))),
    }
}
