//! # pgfluent
//!
//! A chain-and-await query shim over PostgreSQL.
//!
//! ## Features
//!
//! - **Fluent builders**: `db.from(table).select(..).eq(..).order(..).limit(..).await`
//! - **One descriptor, two targets**: the same query compiles to parameterized SQL
//!   (direct database access) or to a REST request against `/api/<table>`
//! - **Uniform envelope**: every awaited builder resolves to [`Response`]
//!   `{data, error, count}` and never panics
//! - **Tenant scoping**: REST requests always carry the session's `user_id`
//! - **Safe defaults**: identifiers are quoted, values are bound, unfiltered
//!   UPDATE/DELETE are logged (or refused, see [`DangerousDmlPolicy`])
//!
//! ## Server side (SQL)
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! let db = Db::connect_from_env()?;
//!
//! let res = db
//!     .from("invoices")
//!     .select("*")
//!     .eq("status", "paid")
//!     .order("issued_on", Direction::Desc)
//!     .limit(20)
//!     .await;
//!
//! let paid: Vec<Invoice> = res.decode()?;
//! ```
//!
//! ## Client side (REST)
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! let db = Db::http(ReqwestTransport::from_env()?, Some(Session::new(user_id)));
//! let res = db.from("contacts").insert(json!({"name": "Ada"})).single().await;
//! ```
//!
//! ## Logging
//!
//! Compiled SQL is emitted at `debug` under the `pgfluent.sql` target, REST
//! requests under `pgfluent.http`. No subscriber is installed.

pub mod backend;
pub mod client;
pub mod compile;
pub mod condition;
pub mod config;
pub mod db;
pub mod descriptor;
pub mod error;
pub mod ident;
pub mod param;
pub mod prelude;
pub mod qb;
pub mod response;
pub mod row;
pub mod session;
pub mod storage;

#[cfg(feature = "pool")]
pub mod pool;

pub use backend::{Backend, HttpBackend, HttpReply, Outcome, SqlBackend, Transport};
pub use client::GenericClient;
pub use compile::{Body, CompiledSql, HttpRequest, Method, compile_count, compile_http, compile_sql};
pub use condition::{Condition, Operator};
pub use config::{ClientConfig, DangerousDmlPolicy, DatabaseConfig, HttpConfig, RowShapePolicy};
pub use db::Db;
pub use descriptor::{Count, Direction, Operation, Order, Payload, Query};
pub use error::{OrmError, OrmResult};
pub use ident::Ident;
pub use param::Param;
pub use qb::{
    DeleteBuilder, Filter, InsertBuilder, SelectBuilder, SelectOptions, SingleBuilder, TableRef,
    UpdateBuilder, UpsertBuilder, UpsertOptions,
};
pub use response::Response;
pub use row::Record;
pub use session::{Auth, Session, User};
pub use storage::{Bucket, Storage};

#[cfg(feature = "http")]
pub use backend::ReqwestTransport;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
