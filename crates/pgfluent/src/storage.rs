//! File storage pass-through over `/api/storage/<bucket>/<path>`.
//!
//! Only request plumbing lives here; what the endpoints do with the files is
//! up to the API.

use crate::backend::{HttpBackend, Transport};
use crate::compile::http::{USER_ID, join_api_path};
use crate::compile::{Body, HttpRequest, Method};
use crate::error::{OrmError, OrmResult};
use crate::response::Response;
use bytes::Bytes;
use serde_json::{Value, json};

/// Entry point returned by [`Db::storage`](crate::Db::storage).
#[derive(Debug)]
pub struct Storage<'a, T> {
    backend: &'a HttpBackend<T>,
}

impl<'a, T: Transport> Storage<'a, T> {
    pub(crate) fn new(backend: &'a HttpBackend<T>) -> Self {
        Self { backend }
    }

    pub fn from(&self, bucket: &str) -> Bucket<'a, T> {
        Bucket {
            backend: self.backend,
            bucket: bucket.to_string(),
        }
    }
}

/// One storage bucket.
#[derive(Debug)]
pub struct Bucket<'a, T> {
    backend: &'a HttpBackend<T>,
    bucket: String,
}

impl<T: Transport> Bucket<'_, T> {
    fn path(&self, object: &str) -> OrmResult<String> {
        let object = object.trim_start_matches('/');
        if self.bucket.is_empty() || self.bucket.contains(['/', '?', '#']) {
            return Err(OrmError::validation(format!(
                "Invalid bucket name '{}'",
                self.bucket
            )));
        }
        if object.is_empty() || object.split('/').any(|seg| seg == "..") {
            return Err(OrmError::validation(format!("Invalid object path '{object}'")));
        }
        Ok(format!("/api/storage/{}/{object}", self.bucket))
    }

    fn request(&self, method: Method, object: &str) -> OrmResult<HttpRequest> {
        let mut req = HttpRequest::new(method, self.path(object)?);
        let session = self.backend.require_session()?;
        req.param(USER_ID, session.user_id.clone());
        Ok(req)
    }

    /// Upload `data` to `object`.
    pub async fn upload(
        &self,
        object: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> Response<Value> {
        let result = async {
            let mut req = self.request(Method::Post, object)?;
            req.body = Some(Body::Bytes {
                content_type: content_type.to_string(),
                data: data.into(),
            });
            self.backend.exchange(req).await
        }
        .await;
        into_response(result.map(data_field))
    }

    /// Download the bytes of `object`.
    pub async fn download(&self, object: &str) -> Response<Bytes> {
        let result = async {
            let req = self.request(Method::Get, object)?;
            self.backend.exchange_raw(req).await
        }
        .await;
        into_response(result)
    }

    /// Remove several objects in one request.
    pub async fn remove(&self, objects: &[&str]) -> Response<Value> {
        let result = async {
            for object in objects {
                self.path(object)?;
            }
            let mut req = HttpRequest::new(Method::Delete, format!("/api/storage/{}", self.bucket));
            let session = self.backend.require_session()?;
            req.param(USER_ID, session.user_id.clone());
            req.body = Some(Body::Json(json!({ "paths": objects })));
            self.backend.exchange(req).await
        }
        .await;
        into_response(result.map(data_field))
    }

    /// Public URL of `object`, resolved against the transport's API base URL when it has one.
    pub fn public_url(&self, object: &str) -> OrmResult<String> {
        let path = self.path(object)?;
        match self.backend.transport().base_url() {
            Some(base) => join_api_path(base, &path).map(|url| url.to_string()),
            None => Ok(path),
        }
    }
}

fn data_field(body: Value) -> Value {
    match body {
        Value::Object(mut obj) if obj.contains_key("data") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn into_response<T>(result: OrmResult<T>) -> Response<T> {
    match result {
        Ok(data) => Response::ok(Some(data)),
        Err(e) => {
            tracing::debug!(target: "pgfluent.http", error = %e, "storage request failed");
            Response::err(e)
        }
    }
}
