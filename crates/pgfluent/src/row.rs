//! Row mapping: Postgres rows to JSON records.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

/// One result row: column name to JSON value, in column order.
pub type Record = Map<String, Value>;

/// Decode a `tokio_postgres::Row` into a [`Record`].
///
/// Numeric columns become strings so that money amounts are not rounded
/// through `f64`. Dates and timestamps become ISO-8601 strings.
pub fn record_from_row(row: &Row) -> OrmResult<Record> {
    let mut record = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_())
            .map_err(|message| OrmError::decode(column.name(), message))?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn get<'a, T>(row: &'a Row, idx: usize) -> Result<Option<T>, String>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
}

fn decode_column(row: &Row, idx: usize, ty: &Type) -> Result<Value, String> {
    if let Kind::Array(member) = ty.kind() {
        return decode_array(row, idx, member);
    }
    if let Kind::Enum(_) = ty.kind() {
        return decode_enum(row, idx);
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::from),
        Type::INT2 => get::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::from),
        Type::OID => get::<u32>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(|f| Value::from(f as f64)),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::from),
        Type::NUMERIC => get::<Decimal>(row, idx)?.map(|d| Value::String(d.to_string())),
        Type::JSON | Type::JSONB => get::<Value>(row, idx)?,
        Type::UUID => get::<uuid::Uuid>(row, idx)?.map(|u| Value::String(u.to_string())),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(|d| Value::String(d.to_string())),
        Type::TIME => get::<NaiveTime>(row, idx)?.map(|t| Value::String(t.to_string())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?
            .map(|t| Value::String(t.to_rfc3339())),
        _ => get::<String>(row, idx)
            .map_err(|_| format!("unsupported column type {ty}"))?
            .map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn decode_array(row: &Row, idx: usize, member: &Type) -> Result<Value, String> {
    let value = match *member {
        Type::BOOL => get::<Vec<Option<bool>>>(row, idx)?.map(Value::from),
        Type::INT2 => get::<Vec<Option<i16>>>(row, idx)?.map(Value::from),
        Type::INT4 => get::<Vec<Option<i32>>>(row, idx)?.map(Value::from),
        Type::INT8 => get::<Vec<Option<i64>>>(row, idx)?.map(Value::from),
        Type::FLOAT8 => get::<Vec<Option<f64>>>(row, idx)?.map(Value::from),
        Type::NUMERIC => get::<Vec<Option<Decimal>>>(row, idx)?.map(|items| {
            items
                .into_iter()
                .map(|d| d.map_or(Value::Null, |d| Value::String(d.to_string())))
                .collect()
        }),
        Type::UUID => get::<Vec<Option<uuid::Uuid>>>(row, idx)?.map(|items| {
            items
                .into_iter()
                .map(|u| u.map_or(Value::Null, |u| Value::String(u.to_string())))
                .collect()
        }),
        Type::JSON | Type::JSONB => get::<Vec<Value>>(row, idx)?.map(Value::Array),
        _ => get::<Vec<Option<String>>>(row, idx)
            .map_err(|_| format!("unsupported array element type {member}"))?
            .map(Value::from),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Enum labels arrive as their UTF-8 text.
fn decode_enum(row: &Row, idx: usize) -> Result<Value, String> {
    let raw = row
        .try_get::<_, Option<EnumLabel>>(idx)
        .map_err(|e| e.to_string())?;
    Ok(raw.map_or(Value::Null, |label| Value::String(label.0)))
}

struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}
