//! The query descriptor: everything a builder has accumulated, not yet executed.
//!
//! A [`Query`] carries exactly one [`Operation`]. Both compilers (SQL and HTTP)
//! read the same descriptor.

use crate::condition::Condition;
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use serde_json::Value;

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub(crate) fn as_param(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// The single ordering key of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Row-count mode requested through [`SelectOptions`](crate::SelectOptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// `COUNT(*)` over the filtered table.
    Exact,
}

/// Rows handed to INSERT / UPSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Record),
    Many(Vec<Record>),
}

impl Payload {
    /// Interpret a JSON value as a payload: an object is one row, an array of objects many.
    pub fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Object(row) => Ok(Payload::One(row)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(OrmError::validation(format!(
                        "Row {i} of the payload is not an object: {other}"
                    ))),
                })
                .collect::<OrmResult<Vec<_>>>()
                .map(Payload::Many),
            other => Err(OrmError::validation(format!(
                "Payload must be an object or an array of objects, got {other}"
            ))),
        }
    }

    /// All rows, in order.
    pub fn rows(&self) -> &[Record] {
        match self {
            Payload::One(row) => std::slice::from_ref(row),
            Payload::Many(rows) => rows,
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Record] {
        match self {
            Payload::One(row) => std::slice::from_mut(row),
            Payload::Many(rows) => rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Column names of the first row, which decide the column list of the statement.
    pub fn columns(&self) -> Vec<&str> {
        self.rows()
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Payload::One(row) => Value::Object(row),
            Payload::Many(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
        }
    }
}

/// SELECT state.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectSpec {
    pub projection: String,
    pub order: Option<Order>,
    pub limit: Option<u64>,
    pub single: bool,
    pub count: Option<Count>,
    /// Only count, return no rows.
    pub head: bool,
}

impl Default for SelectSpec {
    fn default() -> Self {
        Self {
            projection: "*".to_string(),
            order: None,
            limit: None,
            single: false,
            count: None,
            head: false,
        }
    }
}

impl SelectSpec {
    /// The row cap actually applied (`single` forces 1).
    pub fn effective_limit(&self) -> Option<u64> {
        if self.single { Some(1) } else { self.limit }
    }
}

/// INSERT state.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertSpec {
    pub rows: Payload,
    pub returning: String,
}

/// UPDATE state.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    pub patch: Record,
    pub returning: String,
}

/// UPSERT state.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertSpec {
    pub rows: Payload,
    /// Comma-separated conflict columns; defaults to the first column of the first row.
    pub on_conflict: Option<String>,
    pub ignore_duplicates: bool,
    pub returning: String,
}

impl UpsertSpec {
    /// Conflict target columns after applying the default.
    pub fn conflict_columns(&self) -> Vec<String> {
        match self.on_conflict.as_deref() {
            Some(target) if !target.trim().is_empty() => target
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            _ => self
                .rows
                .columns()
                .first()
                .map(|c| vec![c.to_string()])
                .unwrap_or_default(),
        }
    }
}

/// The pending operation of a query. Exactly one per descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select(SelectSpec),
    Insert(InsertSpec),
    Update(UpdateSpec),
    Upsert(UpsertSpec),
    Delete,
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Select(_) => "select",
            Operation::Insert(_) => "insert",
            Operation::Update(_) => "update",
            Operation::Upsert(_) => "upsert",
            Operation::Delete => "delete",
        }
    }
}

/// The accumulated, not-yet-executed description of one database operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub conditions: Vec<Condition>,
    pub operation: Operation,
}

impl Query {
    pub fn new(table: impl Into<String>, operation: Operation) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            operation,
        }
    }

    /// Whether the caller expects a single unwrapped row.
    pub fn is_single(&self) -> bool {
        matches!(&self.operation, Operation::Select(spec) if spec.single)
    }

    /// An INSERT/UPSERT with no rows: a vacuous success that never reaches a backend.
    pub fn is_vacuous(&self) -> bool {
        match &self.operation {
            Operation::Insert(spec) => spec.rows.is_empty(),
            Operation::Upsert(spec) => spec.rows.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_shapes() {
        assert!(matches!(
            Payload::from_value(json!({"a": 1})).unwrap(),
            Payload::One(_)
        ));
        let many = Payload::from_value(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(many.rows().len(), 2);
        assert!(Payload::from_value(json!([{"a": 1}, 2])).is_err());
        assert!(Payload::from_value(json!("row")).is_err());
        assert!(Payload::from_value(json!([])).unwrap().is_empty());
    }

    #[test]
    fn columns_come_from_first_row_in_key_order() {
        let payload = Payload::from_value(json!([{"name": "a", "email": "x"}, {"other": 1}])).unwrap();
        assert_eq!(payload.columns(), vec!["name", "email"]);
    }

    #[test]
    fn conflict_target_defaults_to_first_column() {
        let spec = UpsertSpec {
            rows: Payload::from_value(json!({"email": "a@b.c", "name": "A"})).unwrap(),
            on_conflict: None,
            ignore_duplicates: false,
            returning: "*".into(),
        };
        assert_eq!(spec.conflict_columns(), vec!["email"]);

        let spec = UpsertSpec {
            on_conflict: Some("user_id, sku".into()),
            ..spec
        };
        assert_eq!(spec.conflict_columns(), vec!["user_id", "sku"]);
    }

    #[test]
    fn single_forces_limit_one() {
        let spec = SelectSpec {
            limit: Some(50),
            single: true,
            ..SelectSpec::default()
        };
        assert_eq!(spec.effective_limit(), Some(1));
    }
}
