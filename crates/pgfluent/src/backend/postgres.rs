use super::{Backend, Outcome, truncate_bytes};
use crate::client::GenericClient;
use crate::compile::{CompiledSql, compile_count, compile_sql};
use crate::config::ClientConfig;
use crate::descriptor::{Operation, Query};
use crate::error::{OrmError, OrmResult};
use serde_json::Value;

/// Direct database access through any [`GenericClient`].
///
/// # Example
/// ```ignore
/// let pool = pgfluent::create_pool(&std::env::var("DATABASE_URL")?)?;
/// let db = pgfluent::Db::new(pgfluent::SqlBackend::new(pool));
/// ```
#[derive(Debug, Clone)]
pub struct SqlBackend<C> {
    client: C,
    config: ClientConfig,
}

impl<C: GenericClient> SqlBackend<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, ClientConfig::default())
    }

    pub fn with_config(client: C, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn log(&self, operation: &'static str, compiled: &CompiledSql) {
        let sql = match self.config.max_sql_log_length {
            Some(max) if compiled.sql.len() > max => {
                format!("{}...", truncate_bytes(&compiled.sql, max))
            }
            _ => compiled.sql.clone(),
        };
        tracing::debug!(
            target: "pgfluent.sql",
            operation,
            param_count = compiled.params.len(),
            sql = %sql,
        );
    }

    async fn count(&self, query: &Query) -> OrmResult<Option<i64>> {
        let Some(compiled) = compile_count(query)? else {
            return Ok(None);
        };
        self.log("count", &compiled);
        let rows = self.client.query(&compiled.sql, &compiled.params).await?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .map(Some)
            .ok_or_else(|| OrmError::decode("count", "COUNT(*) returned no integer"))
    }
}

impl<C: GenericClient> Backend for SqlBackend<C> {
    async fn run(&self, query: Query) -> OrmResult<Outcome> {
        let compiled = compile_sql(&query, &self.config)?;
        let head = matches!(&query.operation, Operation::Select(spec) if spec.head);

        let rows = if head {
            None
        } else if compiled.returns_rows {
            self.log(query.operation.kind(), &compiled);
            Some(self.client.query(&compiled.sql, &compiled.params).await?)
        } else {
            self.log(query.operation.kind(), &compiled);
            self.client.execute(&compiled.sql, &compiled.params).await?;
            None
        };

        let count = self.count(&query).await?;
        Ok(Outcome { rows, count })
    }
}
