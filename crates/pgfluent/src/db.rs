//! The public facade: `db.from(table)`.

use crate::backend::{Backend, HttpBackend, SqlBackend, Transport};
use crate::client::GenericClient;
use crate::config::ClientConfig;
use crate::qb::TableRef;
use crate::session::{Auth, Session};
use crate::storage::Storage;

/// Entry point for building queries against one backend.
///
/// # Example
/// ```ignore
/// use pgfluent::prelude::*;
///
/// // Server side: direct SQL through a pool.
/// let db = Db::connect_from_env()?;
///
/// // Client side: REST routes, scoped to the signed-in user.
/// let db = Db::http(ReqwestTransport::from_env()?, Some(Session::new(user_id)));
///
/// let res = db.from("invoices").select("*").eq("status", "paid").await;
/// ```
#[derive(Debug, Clone)]
pub struct Db<B> {
    backend: B,
}

impl<B: Backend> Db<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Start a query on `table`.
    pub fn from(&self, table: &str) -> TableRef<'_, B> {
        TableRef::new(&self.backend, table)
    }

    /// The session this handle acts for.
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self.backend.session())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<C: GenericClient> Db<SqlBackend<C>> {
    /// Direct SQL through any client, transaction or pool.
    pub fn postgres(client: C) -> Self {
        Self::new(SqlBackend::new(client))
    }

    pub fn postgres_with_config(client: C, config: ClientConfig) -> Self {
        Self::new(SqlBackend::with_config(client, config))
    }
}

#[cfg(feature = "pool")]
impl Db<SqlBackend<deadpool_postgres::Pool>> {
    /// Build a pooled handle from `DATABASE_URL` / `DATABASE_POOL_SIZE`.
    ///
    /// Configuration problems are returned here rather than on first query.
    pub fn connect_from_env() -> crate::OrmResult<Self> {
        let config = crate::config::DatabaseConfig::from_env()?;
        let pool = crate::pool::create_pool_from_config(&config)?;
        Ok(Self::postgres(pool))
    }
}

impl<T: Transport> Db<HttpBackend<T>> {
    /// REST access on behalf of `session`. Without one, every query fails
    /// with [`OrmError::Unauthenticated`](crate::OrmError::Unauthenticated).
    pub fn http(transport: T, session: Option<Session>) -> Self {
        Self::new(HttpBackend::new(transport, session))
    }

    pub fn storage(&self) -> Storage<'_, T> {
        Storage::new(&self.backend)
    }
}
