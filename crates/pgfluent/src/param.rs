//! Query parameters.
//!
//! Values reach the shim as JSON (filter values, insert payloads). A [`Param`]
//! keeps the JSON value and encodes it for whatever parameter type Postgres
//! inferred for its placeholder, so `"amount" > $1` binds `$1` as numeric and
//! `"id" = $1` binds it as uuid without the caller naming any SQL type.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};

type EncodeResult = Result<IsNull, Box<dyn Error + Sync + Send>>;

/// A JSON value bound as a positional SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param(Value);

impl Param {
    /// Wrap a JSON value.
    pub fn new(value: impl Into<Value>) -> Self {
        Param(value.into())
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param(value)
    }
}

impl ToSql for Param {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> EncodeResult {
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }
        encode(&self.0, ty, out)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn encode(value: &Value, ty: &Type, out: &mut BytesMut) -> EncodeResult {
    if let Kind::Array(_) = ty.kind() {
        let Value::Array(items) = value else {
            return Err(mismatch(value, ty));
        };
        let items: Vec<Param> = items.iter().cloned().map(Param).collect();
        return items.to_sql(ty, out);
    }
    if let Kind::Enum(_) = ty.kind() {
        let label = as_text(value).ok_or_else(|| mismatch(value, ty))?;
        out.extend_from_slice(label.as_bytes());
        return Ok(IsNull::No);
    }

    match *ty {
        Type::BOOL => as_bool(value).ok_or_else(|| mismatch(value, ty))?.to_sql(ty, out),
        Type::INT2 => {
            let n = as_i64(value).ok_or_else(|| mismatch(value, ty))?;
            i16::try_from(n)?.to_sql(ty, out)
        }
        Type::INT4 => {
            let n = as_i64(value).ok_or_else(|| mismatch(value, ty))?;
            i32::try_from(n)?.to_sql(ty, out)
        }
        Type::INT8 => as_i64(value).ok_or_else(|| mismatch(value, ty))?.to_sql(ty, out),
        Type::FLOAT4 => {
            (as_f64(value).ok_or_else(|| mismatch(value, ty))? as f32).to_sql(ty, out)
        }
        Type::FLOAT8 => as_f64(value).ok_or_else(|| mismatch(value, ty))?.to_sql(ty, out),
        Type::NUMERIC => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))?
                .to_sql(ty, out)
        }
        Type::JSON | Type::JSONB => value.to_sql(ty, out),
        Type::UUID => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            uuid::Uuid::parse_str(&text)?.to_sql(ty, out)
        }
        Type::DATE => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            parse_date(&text)
                .ok_or_else(|| format!("invalid date '{text}'"))?
                .to_sql(ty, out)
        }
        Type::TIME => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            NaiveTime::parse_from_str(&text, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M"))?
                .to_sql(ty, out)
        }
        Type::TIMESTAMP => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            parse_naive_datetime(&text)
                .ok_or_else(|| format!("invalid timestamp '{text}'"))?
                .to_sql(ty, out)
        }
        Type::TIMESTAMPTZ => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            parse_datetime_utc(&text)
                .ok_or_else(|| format!("invalid timestamptz '{text}'"))?
                .to_sql(ty, out)
        }
        // Text-like types share the UTF-8 binary representation.
        ref t if is_text_like(t) => {
            let text = as_text(value).ok_or_else(|| mismatch(value, ty))?;
            out.extend_from_slice(text.as_bytes());
            Ok(IsNull::No)
        }
        _ => Err(format!("unsupported parameter type {ty}").into()),
    }
}

fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || ty.name() == "citext"
}

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot bind JSON value {value} as postgres type {ty}").into()
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "t" => Some(true),
            "false" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scalars as text; arrays and objects have no text form here.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| text.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn parse_naive_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_datetime_utc(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_naive_datetime(text).map(|naive| naive.and_utc()))
}
