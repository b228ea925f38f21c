//! Compilers from a [`Query`] to something a backend can run.
//!
//! - [`sql`]: one parameterized SQL statement (`$1, $2, ...`).
//! - [`http`]: one REST request against `/api/<table>`.
//!
//! Both read the same descriptor and share no state.

pub mod http;
pub mod sql;

pub use http::{Body, HttpRequest, Method, compile_http};
pub use sql::{CompiledSql, compile_count, compile_sql};

use crate::config::{ClientConfig, DangerousDmlPolicy};
use crate::descriptor::{Operation, Query};
use crate::error::{OrmError, OrmResult};

/// Apply the unfiltered UPDATE/DELETE policy.
pub(crate) fn check_unfiltered(query: &Query, config: &ClientConfig) -> OrmResult<()> {
    let mutates_table = matches!(query.operation, Operation::Update(_) | Operation::Delete);
    if !mutates_table || !query.conditions.is_empty() {
        return Ok(());
    }
    let kind = query.operation.kind();
    match config.unfiltered_mutation {
        DangerousDmlPolicy::Allow => Ok(()),
        DangerousDmlPolicy::Warn => {
            tracing::warn!(
                target: "pgfluent.sql",
                table = %query.table,
                operation = kind,
                "{kind} without filters affects every row"
            );
            Ok(())
        }
        DangerousDmlPolicy::Error => Err(OrmError::validation(format!(
            "{kind} on '{}' without filters is refused",
            query.table
        ))),
    }
}
