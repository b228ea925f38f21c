//! The result envelope returned by every awaited builder.
//!
//! Awaiting never fails: compile and execution errors land in
//! [`Response::error`] and `data` is `None`.
//!
//! ```ignore
//! let res = db.from("invoices").select("*").eq("status", "paid").await;
//! match res.into_result() {
//!     Ok(rows) => println!("{} invoices", rows.map_or(0, |r| r.len())),
//!     Err(e) => eprintln!("query failed: {e}"),
//! }
//! ```

use crate::backend::Outcome;
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// `{data, error, count}`.
#[derive(Debug)]
#[must_use]
pub struct Response<T> {
    pub data: Option<T>,
    pub error: Option<OrmError>,
    /// Present when the query asked for an exact count.
    pub count: Option<i64>,
}

impl<T> Response<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            data,
            error: None,
            count: None,
        }
    }

    pub fn err(error: OrmError) -> Self {
        Self {
            data: None,
            error: Some(error),
            count: None,
        }
    }

    pub fn with_count(mut self, count: Option<i64>) -> Self {
        self.count = count;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, dropping the count.
    pub fn into_result(self) -> OrmResult<Option<T>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }

    /// Map the payload, keeping error and count.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            data: self.data.map(f),
            error: self.error,
            count: self.count,
        }
    }
}

impl Response<Vec<Record>> {
    /// Deserialize every row into `T`.
    ///
    /// Returns the envelope error if there is one; missing data decodes as an empty list.
    pub fn decode<T: DeserializeOwned>(self) -> OrmResult<Vec<T>> {
        self.into_result()?
            .unwrap_or_default()
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(OrmError::from))
            .collect()
    }
}

impl Response<Record> {
    /// Deserialize the single row, if any, into `T`.
    pub fn decode_one<T: DeserializeOwned>(self) -> OrmResult<Option<T>> {
        self.into_result()?
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(OrmError::from))
            .transpose()
    }
}

fn log_error(error: &OrmError) {
    tracing::debug!(target: "pgfluent", error = %error, "query returned an error envelope");
}

/// Rows as returned, e.g. a SELECT or a mutation's RETURNING.
pub(crate) fn many(result: OrmResult<Outcome>) -> Response<Vec<Record>> {
    match result {
        Ok(outcome) => Response::ok(outcome.rows).with_count(outcome.count),
        Err(e) => {
            log_error(&e);
            Response::err(e)
        }
    }
}

/// First row or `None`; an empty result is not an error.
pub(crate) fn one(result: OrmResult<Outcome>) -> Response<Record> {
    match result {
        Ok(outcome) => {
            let row = outcome.rows.and_then(|rows| rows.into_iter().next());
            Response::ok(row).with_count(outcome.count)
        }
        Err(e) => {
            log_error(&e);
            Response::err(e)
        }
    }
}

/// Success carries no data (DELETE).
pub(crate) fn empty(result: OrmResult<Outcome>) -> Response<Vec<Record>> {
    match result {
        Ok(outcome) => Response::ok(None).with_count(outcome.count),
        Err(e) => {
            log_error(&e);
            Response::err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Invoice {
        id: i64,
        status: String,
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn outcome(rows: Vec<Value>) -> Outcome {
        Outcome {
            rows: Some(rows.into_iter().map(record).collect()),
            count: None,
        }
    }

    #[test]
    fn single_on_empty_is_null_not_error() {
        let res = one(Ok(outcome(vec![])));
        assert!(res.is_ok());
        assert!(res.data.is_none());
    }

    #[test]
    fn single_takes_first_row() {
        let res = one(Ok(outcome(vec![json!({"id": 1}), json!({"id": 2})])));
        assert_eq!(res.data.unwrap()["id"], json!(1));
    }

    #[test]
    fn errors_never_carry_data() {
        let res = many(Err(OrmError::validation("bad")));
        assert!(res.data.is_none());
        assert!(res.error.as_ref().unwrap().is_validation());
        assert!(res.into_result().is_err());
    }

    #[test]
    fn delete_success_has_no_data() {
        let res = empty(Ok(outcome(vec![json!({"id": 1})])));
        assert!(res.is_ok());
        assert!(res.data.is_none());
    }

    #[test]
    fn count_is_carried() {
        let mut out = outcome(vec![]);
        out.count = Some(12);
        assert_eq!(many(Ok(out)).count, Some(12));
    }

    #[test]
    fn decode_rows_into_structs() {
        let res = many(Ok(outcome(vec![
            json!({"id": 1, "status": "paid"}),
            json!({"id": 2, "status": "draft"}),
        ])));
        let invoices: Vec<Invoice> = res.decode().unwrap();
        assert_eq!(invoices[1], Invoice { id: 2, status: "draft".into() });

        let res = one(Ok(outcome(vec![json!({"id": 1, "status": "paid"})])));
        let invoice: Option<Invoice> = res.decode_one().unwrap();
        assert_eq!(invoice.unwrap().id, 1);
    }

    #[test]
    fn decode_mismatch_is_serialization_error() {
        let res = many(Ok(outcome(vec![json!({"id": "x"})])));
        let err = res.decode::<Invoice>().unwrap_err();
        assert!(matches!(err, OrmError::Serialization(_)));
    }

    #[test]
    fn map_keeps_count() {
        let res = Response::ok(Some(vec![1, 2])).with_count(Some(2)).map(|v| v.len());
        assert_eq!(res.data, Some(2));
        assert_eq!(res.count, Some(2));
    }
}
