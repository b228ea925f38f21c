//! SQL compiler.
//!
//! Turns a [`Query`] into one statement plus its positional parameters.
//! Identifiers are always quoted; values are always bound, except the
//! `IS [NOT] NULL|TRUE|FALSE` literals. `eq`/`neq` against null compile to
//! `IS [NOT] NULL`.

use super::check_unfiltered;
use crate::condition::{Condition, Operator};
use crate::config::{ClientConfig, RowShapePolicy};
use crate::descriptor::{InsertSpec, Operation, Payload, Query, SelectSpec, UpdateSpec, UpsertSpec};
use crate::error::{OrmError, OrmResult};
use crate::ident::{Ident, projection_sql};
use crate::param::Param;
use serde_json::Value;
use std::collections::BTreeSet;

/// A compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<Param>,
    /// Whether the statement produces rows (SELECT or RETURNING).
    pub returns_rows: bool,
}

impl CompiledSql {
    /// Parameter values, in placeholder order.
    pub fn values(&self) -> Vec<&Value> {
        self.params.iter().map(Param::value).collect()
    }
}

/// Compile the main statement of a query.
pub fn compile_sql(query: &Query, config: &ClientConfig) -> OrmResult<CompiledSql> {
    check_unfiltered(query, config)?;
    let table = Ident::parse(&query.table)?.to_sql();
    let mut params = Vec::new();

    let (sql, returns_rows) = match &query.operation {
        Operation::Select(spec) => (select_sql(&table, query, spec, &mut params)?, true),
        Operation::Insert(spec) => (insert_sql(&table, spec, config, &mut params)?, true),
        Operation::Update(spec) => (update_sql(&table, query, spec, &mut params)?, true),
        Operation::Upsert(spec) => (upsert_sql(&table, spec, config, &mut params)?, true),
        Operation::Delete => {
            let mut sql = format!("DELETE FROM {table}");
            push_where(&mut sql, &query.conditions, &mut params)?;
            (sql, false)
        }
    };

    Ok(CompiledSql {
        sql,
        params,
        returns_rows,
    })
}

/// Compile the `COUNT(*)` companion of a SELECT that asked for an exact count.
///
/// Returns `None` when no count was requested.
pub fn compile_count(query: &Query) -> OrmResult<Option<CompiledSql>> {
    let Operation::Select(spec) = &query.operation else {
        return Ok(None);
    };
    if spec.count.is_none() {
        return Ok(None);
    }
    let table = Ident::parse(&query.table)?.to_sql();
    let mut params = Vec::new();
    let mut sql = format!(r#"SELECT COUNT(*) AS "count" FROM {table}"#);
    push_where(&mut sql, &query.conditions, &mut params)?;
    Ok(Some(CompiledSql {
        sql,
        params,
        returns_rows: true,
    }))
}

fn select_sql(
    table: &str,
    query: &Query,
    spec: &SelectSpec,
    params: &mut Vec<Param>,
) -> OrmResult<String> {
    let mut sql = format!("SELECT {} FROM {table}", projection_sql(&spec.projection)?);
    push_where(&mut sql, &query.conditions, params)?;
    if let Some(order) = &spec.order {
        sql.push_str(" ORDER BY ");
        sql.push_str(&Ident::parse(&order.column)?.to_sql());
        sql.push(' ');
        sql.push_str(order.direction.as_sql());
    }
    if let Some(limit) = spec.effective_limit() {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(sql)
}

fn insert_sql(
    table: &str,
    spec: &InsertSpec,
    config: &ClientConfig,
    params: &mut Vec<Param>,
) -> OrmResult<String> {
    let mut sql = values_sql(table, &spec.rows, config, params)?;
    push_returning(&mut sql, &spec.returning)?;
    Ok(sql)
}

fn update_sql(
    table: &str,
    query: &Query,
    spec: &UpdateSpec,
    params: &mut Vec<Param>,
) -> OrmResult<String> {
    if spec.patch.is_empty() {
        return Err(OrmError::validation("UPDATE requires at least one column to SET"));
    }
    let mut assignments = Vec::with_capacity(spec.patch.len());
    for (column, value) in &spec.patch {
        params.push(Param::new(value.clone()));
        assignments.push(format!("{} = ${}", Ident::quoted(column)?.to_sql(), params.len()));
    }
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    push_where(&mut sql, &query.conditions, params)?;
    push_returning(&mut sql, &spec.returning)?;
    Ok(sql)
}

fn upsert_sql(
    table: &str,
    spec: &UpsertSpec,
    config: &ClientConfig,
    params: &mut Vec<Param>,
) -> OrmResult<String> {
    let mut sql = values_sql(table, &spec.rows, config, params)?;

    let targets = spec
        .conflict_columns()
        .iter()
        .map(|c| Ident::parse(c))
        .collect::<OrmResult<Vec<_>>>()?;
    if targets.is_empty() {
        return Err(OrmError::validation("UPSERT needs at least one conflict column"));
    }
    let target_sql: Vec<String> = targets.iter().map(Ident::to_sql).collect();
    sql.push_str(&format!(" ON CONFLICT ({})", target_sql.join(", ")));

    let updates = spec
        .rows
        .columns()
        .into_iter()
        .filter(|column| !targets.iter().any(|t| t.name() == *column))
        .map(|column| {
            let col = Ident::quoted(column)?.to_sql();
            Ok(format!("{col} = EXCLUDED.{col}"))
        })
        .collect::<OrmResult<Vec<_>>>()?;

    if spec.ignore_duplicates || updates.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&updates.join(", "));
    }

    push_returning(&mut sql, &spec.returning)?;
    Ok(sql)
}

/// `INSERT INTO t (cols) VALUES (...), (...)` with columns taken from the first row.
fn values_sql(
    table: &str,
    payload: &Payload,
    config: &ClientConfig,
    params: &mut Vec<Param>,
) -> OrmResult<String> {
    let rows = payload.rows();
    let columns = payload.columns();

    if columns.is_empty() {
        if rows.len() > 1 {
            return Err(OrmError::validation(
                "Cannot insert several rows that have no columns",
            ));
        }
        return Ok(format!("INSERT INTO {table} DEFAULT VALUES"));
    }

    if config.row_shape == RowShapePolicy::Strict {
        check_row_shapes(payload)?;
    }

    let column_sql = columns
        .iter()
        .map(|c| Ident::quoted(c).map(|i| i.to_sql()))
        .collect::<OrmResult<Vec<_>>>()?;

    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            params.push(Param::new(row.get(*column).cloned().unwrap_or(Value::Null)));
            placeholders.push(format!("${}", params.len()));
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES {}",
        column_sql.join(", "),
        tuples.join(", ")
    ))
}

fn check_row_shapes(payload: &Payload) -> OrmResult<()> {
    let rows = payload.rows();
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let expected: BTreeSet<&str> = first.keys().map(String::as_str).collect();
    for (i, row) in rows.iter().enumerate().skip(1) {
        let keys: BTreeSet<&str> = row.keys().map(String::as_str).collect();
        if keys != expected {
            let missing: Vec<&str> = expected.difference(&keys).copied().collect();
            let extra: Vec<&str> = keys.difference(&expected).copied().collect();
            return Err(OrmError::validation(format!(
                "Row {i} has different columns than row 0 (missing: {missing:?}, extra: {extra:?})"
            )));
        }
    }
    Ok(())
}

fn push_returning(sql: &mut String, returning: &str) -> OrmResult<()> {
    sql.push_str(" RETURNING ");
    sql.push_str(&projection_sql(returning)?);
    Ok(())
}

fn push_where(sql: &mut String, conditions: &[Condition], params: &mut Vec<Param>) -> OrmResult<()> {
    if conditions.is_empty() {
        return Ok(());
    }
    let predicates = conditions
        .iter()
        .map(|c| condition_sql(c, params))
        .collect::<OrmResult<Vec<_>>>()?;
    sql.push_str(" WHERE ");
    sql.push_str(&predicates.join(" AND "));
    Ok(())
}

/// Render one predicate, appending its values to `params`.
pub(crate) fn condition_sql(condition: &Condition, params: &mut Vec<Param>) -> OrmResult<String> {
    condition.validate()?;
    let col = Ident::parse(&condition.column)?.to_sql();
    let value = &condition.value;

    let sql = match &condition.operator {
        Operator::Eq if value.is_null() => format!("{col} IS NULL"),
        Operator::Neq if value.is_null() => format!("{col} IS NOT NULL"),
        Operator::Is => format!("{col} IS {}", is_literal(value)),
        Operator::IsNot => format!("{col} IS NOT {}", is_literal(value)),
        Operator::In => in_sql(&col, "IN", condition.list(), "1=0", params),
        Operator::Not(inner) => match inner.as_ref() {
            Operator::Eq if value.is_null() => format!("{col} IS NOT NULL"),
            Operator::Neq if value.is_null() => format!("{col} IS NULL"),
            Operator::Is => format!("{col} IS NOT {}", is_literal(value)),
            Operator::IsNot => format!("{col} IS {}", is_literal(value)),
            Operator::In => in_sql(&col, "NOT IN", condition.list(), "1=1", params),
            Operator::Like => bind(&col, "NOT LIKE", value, params),
            Operator::Ilike => bind(&col, "NOT ILIKE", value, params),
            other => format!("NOT ({})", bind(&col, comparison(other), value, params)),
        },
        other => bind(&col, comparison(other), value, params),
    };
    Ok(sql)
}

fn comparison(op: &Operator) -> &'static str {
    match op {
        Operator::Eq => "=",
        Operator::Neq => "!=",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Like => "LIKE",
        Operator::Ilike => "ILIKE",
        // Only reached for operators that carry their own rendering above.
        Operator::Is | Operator::IsNot | Operator::In | Operator::Not(_) => "=",
    }
}

fn bind(col: &str, op: &str, value: &Value, params: &mut Vec<Param>) -> String {
    params.push(Param::new(value.clone()));
    format!("{col} {op} ${}", params.len())
}

fn in_sql(col: &str, op: &str, items: &[Value], when_empty: &str, params: &mut Vec<Param>) -> String {
    if items.is_empty() {
        return when_empty.to_string();
    }
    let placeholders: Vec<String> = items
        .iter()
        .map(|item| {
            params.push(Param::new(item.clone()));
            format!("${}", params.len())
        })
        .collect();
    format!("{col} {op} ({})", placeholders.join(","))
}

fn is_literal(value: &Value) -> &'static str {
    match value {
        Value::Bool(true) => "TRUE",
        Value::Bool(false) => "FALSE",
        _ => "NULL",
    }
}
