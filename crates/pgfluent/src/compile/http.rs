//! HTTP compiler.
//!
//! Turns a [`Query`] into a request against the REST routes `/api/<table>`.
//! Every request is scoped to the session user: `user_id` is appended to the
//! query string of reads and deletes and stamped into every written row.

use crate::condition::{Condition, Operator};
use crate::descriptor::{Operation, Payload, Query, SelectSpec, UpsertSpec};
use crate::error::{OrmError, OrmResult};
use crate::session::Session;
use bytes::Bytes;
use serde_json::{Map, Value};
use url::Url;

pub(crate) const USER_ID: &str = "user_id";
const ID: &str = "id";
const NULL: &str = "null";

/// Query keys the REST routes read as modifiers rather than filters.
const MODIFIER_KEYS: [&str; 5] = ["order", "limit", "select", "count", "head"];

/// HTTP method of a compiled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    /// Raw upload, used by storage requests.
    Bytes { content_type: String, data: Bytes },
}

/// A compiled REST request, independent of any HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the API origin, e.g. `/api/invoices`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub(crate) fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// The JSON body, if the request carries one.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(Body::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Value of the first query pair named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Resolve against the API base URL, percent-encoding the query string.
    pub fn url(&self, base: &Url) -> OrmResult<Url> {
        let mut url = join_api_path(base, &self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

/// Append `path` to `base`, keeping any path prefix on `base`:
/// `https://host/books` + `/api/x` is `https://host/books/api/x`.
pub(crate) fn join_api_path(base: &Url, path: &str) -> OrmResult<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| OrmError::Config(format!("Invalid API path '{path}': {e}")))
}

/// Compile a query into a REST request on behalf of `session`.
pub fn compile_http(query: &Query, session: &Session) -> OrmResult<HttpRequest> {
    let path = format!("/api/{}", encode_segment(&query.table)?);
    let conditions = scoped_conditions(query, session);

    match &query.operation {
        Operation::Select(spec) => select_request(path, &conditions, spec, session),
        Operation::Insert(spec) => {
            let mut req = HttpRequest::new(Method::Post, path);
            req.body = Some(Body::Json(stamp_rows(spec.rows.clone(), session, None)));
            push_returning(&mut req, &spec.returning);
            Ok(req)
        }
        Operation::Upsert(spec) => {
            let mut req = HttpRequest::new(Method::Post, path);
            req.body = Some(Body::Json(stamp_rows(spec.rows.clone(), session, Some(spec))));
            push_returning(&mut req, &spec.returning);
            Ok(req)
        }
        Operation::Update(spec) => {
            let id = target_id(&conditions, "update")?;
            let mut body = spec.patch.clone();
            body.insert(ID.to_string(), id);
            body.insert(USER_ID.to_string(), Value::String(session.user_id.clone()));
            let mut req = HttpRequest::new(Method::Put, path);
            req.body = Some(Body::Json(Value::Object(body)));
            push_returning(&mut req, &spec.returning);
            Ok(req)
        }
        Operation::Delete => {
            let id = target_id(&conditions, "delete")?;
            let mut req = HttpRequest::new(Method::Delete, path);
            req.param(ID, render_value(&id));
            req.param(USER_ID, session.user_id.clone());
            Ok(req)
        }
    }
}

fn select_request(
    path: String,
    conditions: &[&Condition],
    spec: &SelectSpec,
    session: &Session,
) -> OrmResult<HttpRequest> {
    let mut req = HttpRequest::new(Method::Get, path);
    for condition in conditions {
        condition.validate()?;
        let (key, value) = condition_param(condition)?;
        req.param(key, value);
    }
    if let Some(order) = &spec.order {
        req.param("order", format!("{}.{}", order.column, order.direction.as_param()));
    }
    if let Some(limit) = spec.effective_limit() {
        req.param("limit", limit.to_string());
    }
    if spec.projection.trim() != "*" {
        req.param("select", spec.projection.clone());
    }
    if spec.count.is_some() {
        req.param("count", "exact");
    }
    if spec.head {
        req.param("head", "true");
    }
    req.param(USER_ID, session.user_id.clone());
    Ok(req)
}

/// Drop caller-supplied `user_id` equality filters; the session decides tenancy.
fn scoped_conditions<'a>(query: &'a Query, session: &Session) -> Vec<&'a Condition> {
    let mut kept = Vec::with_capacity(query.conditions.len());
    for condition in &query.conditions {
        if condition.column == USER_ID && condition.operator == Operator::Eq {
            if render_value(&condition.value) != session.user_id {
                tracing::warn!(
                    target: "pgfluent.http",
                    table = %query.table,
                    "user_id filter replaced by the session user"
                );
            }
            continue;
        }
        kept.push(condition);
    }
    kept
}

/// The `id` of the single row an update or delete targets.
fn target_id(conditions: &[&Condition], kind: &str) -> OrmResult<Value> {
    let mut id = None;
    for condition in conditions {
        if condition.column == ID && condition.operator == Operator::Eq && id.is_none() {
            id = Some(condition.value.clone());
        } else {
            return Err(OrmError::validation(format!(
                "HTTP {kind} only supports a single eq(\"id\", ..) filter, got {} {}",
                condition.column, condition.operator
            )));
        }
    }
    id.ok_or_else(|| OrmError::validation(format!("HTTP {kind} requires eq(\"id\", ..)")))
}

fn condition_param(condition: &Condition) -> OrmResult<(String, String)> {
    let column = &condition.column;
    if MODIFIER_KEYS.contains(&column.as_str()) {
        return Err(OrmError::validation(format!(
            "Column '{column}' cannot be filtered over HTTP: it collides with the '{column}' query modifier"
        )));
    }
    if column.contains("__") {
        return Err(OrmError::validation(format!(
            "Column '{column}' cannot be filtered over HTTP: '__' separates column and operator"
        )));
    }

    let value = &condition.value;
    let pair = match (&condition.operator, value) {
        (Operator::Eq, Value::Null) => (format!("{column}__is"), NULL.to_string()),
        (Operator::Neq, Value::Null) => (format!("{column}__is_not"), NULL.to_string()),
        (Operator::Not(inner), Value::Null) if **inner == Operator::Eq => {
            (format!("{column}__is_not"), NULL.to_string())
        }
        (Operator::Not(inner), Value::Null) if **inner == Operator::Neq => {
            (format!("{column}__is"), NULL.to_string())
        }
        (Operator::Eq, _) => (column.clone(), render_value(value)),
        (Operator::Not(inner), _) => (
            format!("{column}__not"),
            format!("{}.{}", inner.name(), render_value(value)),
        ),
        (other, _) => (format!("{column}__{}", other.name()), render_value(value)),
    };
    Ok(pair)
}

/// Render a filter value as a query-string value.
///
/// Lists are comma-joined; an element that is empty, padded, the literal
/// `null`, or contains `,` `"` `\` `(` `)` is double-quoted with `\` escapes,
/// so `["Smith, John", "Doe"]` becomes `"Smith, John",Doe`.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Null => NULL.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(list_element).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn list_element(value: &Value) -> String {
    let raw = match value {
        Value::Null => return NULL.to_string(),
        Value::Bool(_) | Value::Number(_) => return render_value(value),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    let needs_quotes = raw.is_empty()
        || raw == NULL
        || raw.trim() != raw
        || raw.contains([',', '"', '\\', '(', ')']);
    if !needs_quotes {
        return raw;
    }
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for ch in raw.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

fn stamp_rows(mut rows: Payload, session: &Session, upsert: Option<&UpsertSpec>) -> Value {
    let markers = upsert.map(upsert_markers).unwrap_or_default();
    for row in rows.rows_mut() {
        row.insert(USER_ID.to_string(), Value::String(session.user_id.clone()));
        for (key, value) in &markers {
            row.insert(key.clone(), value.clone());
        }
    }
    rows.into_value()
}

fn upsert_markers(spec: &UpsertSpec) -> Map<String, Value> {
    let mut markers = Map::new();
    markers.insert("_upsert".to_string(), Value::Bool(true));
    let target = spec.conflict_columns().join(",");
    if !target.is_empty() {
        markers.insert("_onConflict".to_string(), Value::String(target));
    }
    if spec.ignore_duplicates {
        markers.insert("_ignoreDuplicates".to_string(), Value::Bool(true));
    }
    markers
}

fn push_returning(req: &mut HttpRequest, returning: &str) {
    if returning.trim() != "*" {
        req.param("select", returning);
    }
}

fn encode_segment(table: &str) -> OrmResult<String> {
    if table.is_empty() || table.contains(['/', '?', '#']) {
        return Err(OrmError::validation(format!("Invalid table name '{table}'")));
    }
    Ok(table.to_string())
}
