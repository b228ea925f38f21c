//! The error carried in [`Response::error`](crate::Response).

use thiserror::Error;

pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query construction and execution.
///
/// Errors raised while a query is compiled or executed never escape an `.await`
/// on a builder; they are carried in [`Response::error`](crate::Response).
/// Only constructors (configuration, pool setup) return them directly.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Bad connection string or unreachable server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other server-side failure while running a statement
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// A column value could not be turned into JSON
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A JSON value could not be bound to the parameter type the server expects
    #[error("Encode error: {0}")]
    Encode(String),

    /// Validation error (bad identifier, malformed payload, unsupported filter, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A payload could not be turned into JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Could not build the pool or check out a connection
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Transport-level HTTP failure
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The REST API answered with an error
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No session is available to scope a request to a tenant
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    Other(String),
}

impl OrmError {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Map constraint SQLSTATEs (23505, 23503, 23514) onto their own variants.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
