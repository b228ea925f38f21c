//! Convenient imports for typical `pgfluent` usage.
//!
//! ```ignore
//! use pgfluent::prelude::*;
//! ```

pub use crate::{
    Count, Db, Direction, Filter, Operator, OrmError, OrmResult, Record, Response,
    SelectOptions, Session, UpsertOptions,
};
pub use serde_json::{Value, json};

#[cfg(feature = "http")]
pub use crate::ReqwestTransport;

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
