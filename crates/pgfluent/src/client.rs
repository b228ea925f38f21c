//! SQL execution adapter.
//!
//! [`GenericClient`] is the only thing the SQL backend needs from a database
//! driver: run a parameterized statement and hand back rows as [`Record`]s.

use crate::error::{OrmError, OrmResult};
use crate::param::Param;
use crate::row::{Record, record_from_row};
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients, transactions and pools.
pub trait GenericClient: Send + Sync {
    /// Execute a statement and return all rows it produces.
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn decode_rows(rows: Vec<tokio_postgres::Row>) -> OrmResult<Vec<Record>> {
    rows.iter().map(record_from_row).collect()
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Record>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        decode_rows(rows)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let refs = param_refs(params);
        tokio_postgres::Client::execute(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Record>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Transaction::query(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        decode_rows(rows)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let refs = param_refs(params);
        tokio_postgres::Transaction::execute(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Record>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        decode_rows(rows)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let refs = param_refs(params);
        tokio_postgres::Client::execute(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)
    }
}

/// A pool checks out one connection per statement and returns it afterwards.
#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Pool {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Record>> {
        let client = self.get().await?;
        GenericClient::query(&client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        let client = self.get().await?;
        GenericClient::execute(&client, sql, params).await
    }
}

impl<C: GenericClient> GenericClient for std::sync::Arc<C> {
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }
}
