use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::{schema, DbError};
use crate::config::{DatabaseSettings, POOLED_URL_SOURCES};

/// How a pool comes into existence: open it, then make the schema ready.
#[async_trait]
pub trait PoolBootstrap: Send + Sync {
    async fn open(&self) -> Result<PgPool, DbError>;
    async fn provision(&self, pool: &PgPool) -> Result<(), DbError>;
}

pub struct PgBootstrap {
    settings: DatabaseSettings,
}

impl PgBootstrap {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PoolBootstrap for PgBootstrap {
    async fn open(&self) -> Result<PgPool, DbError> {
        let url = self.settings.url.as_deref().ok_or_else(|| {
            DbError::Configuration(format!("expected one of {}", POOLED_URL_SOURCES.join(", ")))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .max_lifetime(self.settings.max_lifetime)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect(url)
            .await?;
        debug!(
            source = ?self.settings.url_source,
            max_connections = self.settings.max_connections,
            "postgres pool opened"
        );
        Ok(pool)
    }

    async fn provision(&self, pool: &PgPool) -> Result<(), DbError> {
        schema::ensure(pool, self.settings.direct_url.as_deref()).await
    }
}

/// Owns the process' connection pool.
///
/// The pool is created on the first successful [`Database::pool`] call and
/// shared afterwards. Concurrent first callers wait on the same
/// initialization, so the pool is opened and the schema provisioned exactly
/// once. A failed attempt publishes nothing and the next caller tries again.
pub struct Database {
    bootstrap: Arc<dyn PoolBootstrap>,
    pool: OnceCell<PgPool>,
}

impl Database {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self::with_bootstrap(Arc::new(PgBootstrap::new(settings)))
    }

    pub fn with_bootstrap(bootstrap: Arc<dyn PoolBootstrap>) -> Self {
        Self {
            bootstrap,
            pool: OnceCell::new(),
        }
    }

    pub async fn pool(&self) -> Result<PgPool, DbError> {
        let pool = self.pool.get_or_try_init(|| self.initialize()).await?;
        Ok(pool.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.pool.initialized()
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }

    async fn initialize(&self) -> Result<PgPool, DbError> {
        let pool = self.bootstrap.open().await?;
        if let Err(e) = self.bootstrap.provision(&pool).await {
            error!(error = %e, "schema provisioning failed; discarding pool");
            pool.close().await;
            return Err(e);
        }
        info!("database ready");
        Ok(pool)
    }
}
