use super::{Backend, Outcome};
use crate::compile::{HttpRequest, compile_http};
use crate::descriptor::Query;
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::session::Session;
use bytes::Bytes;
use serde_json::Value;
use url::Url;

/// Raw answer of the REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Bytes,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A reply with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON; an empty body is `null`.
    pub fn to_json(&self) -> OrmResult<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx status or an `{error}` body into [`OrmError::Api`].
    pub(crate) fn check(&self) -> OrmResult<Value> {
        let body = match self.to_json() {
            Ok(body) => body,
            Err(_) if !self.is_success() => {
                return Err(OrmError::api(
                    self.status,
                    String::from_utf8_lossy(&self.body).trim().to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        let message = match body.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => Some(
                obj.get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| Value::Object(obj.clone()).to_string(), str::to_string),
            ),
            Some(other) => Some(other.to_string()),
        };

        match message {
            Some(message) => Err(OrmError::api(self.status, message)),
            None if !self.is_success() => {
                Err(OrmError::api(self.status, format!("HTTP {}", self.status)))
            }
            None => Ok(body),
        }
    }
}

/// Sends compiled requests to the REST API.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
        session: &Session,
    ) -> impl std::future::Future<Output = OrmResult<HttpReply>> + Send;

    /// API base URL (origin plus optional path prefix), used to build public storage URLs.
    fn base_url(&self) -> Option<&Url> {
        None
    }
}

/// [`Transport`] over `reqwest`, forwarding the session's bearer token.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

#[cfg(feature = "http")]
impl ReqwestTransport {
    pub fn new(config: crate::config::HttpConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: crate::config::HttpConfig) -> Self {
        Self {
            client,
            base_url: config.base_url,
        }
    }

    /// Build from `API_BASE_URL`.
    pub fn from_env() -> OrmResult<Self> {
        Ok(Self::new(crate::config::HttpConfig::from_env()?))
    }
}

#[cfg(feature = "http")]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest, session: &Session) -> OrmResult<HttpReply> {
        use crate::compile::{Body, Method};

        let url = request.url(&self.base_url)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        if let Some(token) = &session.access_token {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            Some(Body::Json(value)) => builder.json(&value),
            Some(Body::Bytes { content_type, data }) => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data),
            None => builder,
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(HttpReply { status, body })
    }

    fn base_url(&self) -> Option<&Url> {
        Some(&self.base_url)
    }
}

/// Client-side access through the REST routes, scoped to one session.
///
/// Requests without a session fail with [`OrmError::Unauthenticated`].
#[derive(Debug, Clone)]
pub struct HttpBackend<T> {
    transport: T,
    session: Option<Session>,
}

impl<T: Transport> HttpBackend<T> {
    pub fn new(transport: T, session: Option<Session>) -> Self {
        Self { transport, session }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn require_session(&self) -> OrmResult<&Session> {
        self.session.as_ref().ok_or(OrmError::Unauthenticated)
    }

    /// Send a request and return the checked JSON body.
    pub(crate) async fn exchange(&self, request: HttpRequest) -> OrmResult<Value> {
        let session = self.require_session()?;
        tracing::debug!(
            target: "pgfluent.http",
            method = request.method.as_str(),
            path = %request.path,
            param_count = request.query.len(),
        );
        let reply = self.transport.send(request, session).await?;
        reply.check()
    }

    pub(crate) async fn exchange_raw(&self, request: HttpRequest) -> OrmResult<Bytes> {
        let session = self.require_session()?;
        tracing::debug!(
            target: "pgfluent.http",
            method = request.method.as_str(),
            path = %request.path,
        );
        let reply = self.transport.send(request, session).await?;
        if !reply.is_success() {
            reply.check()?;
        }
        Ok(reply.body)
    }
}

impl<T: Transport> Backend for HttpBackend<T> {
    async fn run(&self, query: Query) -> OrmResult<Outcome> {
        let session = self.require_session()?;
        let request = compile_http(&query, session)?;
        let body = self.exchange(request).await?;
        outcome_from_body(body)
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

/// Read `{data, count}`; a bare array or object is accepted as the data itself.
fn outcome_from_body(body: Value) -> OrmResult<Outcome> {
    let (data, count) = match body {
        Value::Object(mut obj) if obj.contains_key("data") || obj.contains_key("count") => {
            let count = obj.get("count").and_then(Value::as_i64);
            (obj.remove("data").unwrap_or(Value::Null), count)
        }
        other => (other, None),
    };

    let rows = match data {
        Value::Null => None,
        Value::Object(row) => Some(vec![row]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(OrmError::Serialization(format!(
                        "expected a row object in API response, got {other}"
                    ))),
                })
                .collect::<OrmResult<Vec<Record>>>()?,
        ),
        other => {
            return Err(OrmError::Serialization(format!(
                "unexpected API response data: {other}"
            )));
        }
    };

    Ok(Outcome { rows, count })
}
