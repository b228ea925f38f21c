//! Configuration: compile policies and environment-driven connection settings.

use crate::error::{OrmError, OrmResult};

/// Environment variable holding the Postgres connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Optional environment variable overriding the pool size.
pub const DATABASE_POOL_SIZE_ENV: &str = "DATABASE_POOL_SIZE";
/// Environment variable holding the base URL of the REST API.
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

pub(crate) const DEFAULT_POOL_SIZE: usize = 16;

/// How bulk INSERT/UPSERT treats rows whose keys differ from the first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowShapePolicy {
    /// Reject the statement when any row's key set differs from the first row's.
    #[default]
    Strict,
    /// Columns come from the first row only: missing keys bind NULL, extra keys are dropped.
    FirstRow,
}

/// How UPDATE/DELETE without any filter is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DangerousDmlPolicy {
    /// Execute silently.
    Allow,
    /// Execute and emit a `warn` event.
    #[default]
    Warn,
    /// Refuse with a validation error.
    Error,
}

/// Options shared by both backends.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bulk row shape handling.
    pub row_shape: RowShapePolicy,
    /// Unfiltered UPDATE/DELETE handling.
    pub unfiltered_mutation: DangerousDmlPolicy,
    /// Truncate logged SQL (in bytes). `None` logs it whole.
    pub max_sql_log_length: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            row_shape: RowShapePolicy::default(),
            unfiltered_mutation: DangerousDmlPolicy::default(),
            max_sql_log_length: Some(200),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bulk row shape policy.
    pub fn row_shape(mut self, policy: RowShapePolicy) -> Self {
        self.row_shape = policy;
        self
    }

    /// Configure how UPDATE/DELETE without filters is handled.
    pub fn unfiltered_mutation(mut self, policy: DangerousDmlPolicy) -> Self {
        self.unfiltered_mutation = policy;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }
}

/// Direct database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: usize,
}

impl DatabaseConfig {
    /// Read `DATABASE_URL` (required) and `DATABASE_POOL_SIZE` (optional),
    /// loading a `.env` file first when one exists.
    pub fn from_env() -> OrmResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let url = lookup(DATABASE_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| OrmError::Config(format!("{DATABASE_URL_ENV} is not set")))?;

        let pool_size = match lookup(DATABASE_POOL_SIZE_ENV) {
            Some(raw) => raw.trim().parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                OrmError::Config(format!(
                    "{DATABASE_POOL_SIZE_ENV} must be a positive integer, got '{raw}'"
                ))
            })?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self { url, pool_size })
    }
}

/// REST backend settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: url::Url,
}

impl HttpConfig {
    /// Parse a base URL such as `https://books.example.com`.
    pub fn new(base_url: &str) -> OrmResult<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| OrmError::Config(format!("invalid API base URL '{base_url}': {e}")))?;
        Ok(Self { base_url })
    }

    /// Read `API_BASE_URL`, loading a `.env` file first when one exists.
    pub fn from_env() -> OrmResult<Self> {
        let _ = dotenvy::dotenv();
        let raw = std::env::var(API_BASE_URL_ENV)
            .map_err(|_| OrmError::Config(format!("{API_BASE_URL_ENV} is not set")))?;
        Self::new(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn database_url_is_required() {
        let err = DatabaseConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn pool_size_defaults_and_parses() {
        let cfg = DatabaseConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/books")]))
            .unwrap();
        assert_eq!(cfg.pool_size, 16);

        let cfg = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("DATABASE_POOL_SIZE", "4"),
        ]))
        .unwrap();
        assert_eq!(cfg.pool_size, 4);

        assert!(DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/books"),
            ("DATABASE_POOL_SIZE", "zero"),
        ]))
        .is_err());
    }

    #[test]
    fn http_base_url_must_parse() {
        assert!(HttpConfig::new("https://books.example.com").is_ok());
        assert!(HttpConfig::new("not a url").is_err());
    }

    #[test]
    fn client_config_builder() {
        let cfg = ClientConfig::new()
            .row_shape(RowShapePolicy::FirstRow)
            .unfiltered_mutation(DangerousDmlPolicy::Error)
            .no_truncate();
        assert_eq!(cfg.row_shape, RowShapePolicy::FirstRow);
        assert_eq!(cfg.unfiltered_mutation, DangerousDmlPolicy::Error);
        assert_eq!(cfg.max_sql_log_length, None);
    }
}
