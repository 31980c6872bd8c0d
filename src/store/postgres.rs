//! PostgreSQL storage with connection pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::PoolSettings;
use crate::error::{AppError, StoreError};
use crate::metrics;

use super::{NumberStore, Record};

/// PostgreSQL-backed [`NumberStore`].
#[derive(Debug, Clone)]
pub struct PgNumberStore {
    pool: PgPool,
}

impl PgNumberStore {
    /// Open a pool with the given limits and verify the database answers.
    pub async fn connect(dsn: &str, settings: &PoolSettings) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .max_lifetime(settings.max_lifetime)
            .idle_timeout(settings.max_idle)
            .acquire_timeout(settings.acquire_timeout)
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .map_err(AppError::Connect)?;

        let store = Self { pool };
        if let Err(e) = store.ping().await {
            store.pool.close().await;
            return Err(match e {
                StoreError::Database(e) => AppError::Connect(e),
                other => AppError::Store(other),
            });
        }

        info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "PostgreSQL pool initialized"
        );

        Ok(store)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get reference to connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;

        debug!("Database migrations completed");
        Ok(())
    }

    /// Close every pooled connection, waiting for checked-out ones to return.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }
}

#[async_trait]
impl NumberStore for PgNumberStore {
    #[instrument(skip(self), level = "debug")]
    async fn insert(&self, value: i32) -> Result<Record, StoreError> {
        let record = sqlx::query_as::<_, Record>(
            r#"
            INSERT INTO numbers (number)
            VALUES ($1)
            RETURNING id, number
            "#,
        )
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = %record.id, value, "Inserted number");
        Ok(record)
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_sorted(&self) -> Result<Vec<Record>, StoreError> {
        let records = sqlx::query_as::<_, Record>(
            r#"
            SELECT id, number
            FROM numbers
            ORDER BY number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Fetched sorted numbers");
        Ok(records)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Ping the store every `period` until the returned task is aborted.
///
/// Failures are logged and counted; recycling broken connections is left to
/// the pool, which tests each connection before handing it out.
pub fn spawn_health_check<S>(store: S, period: Duration) -> JoinHandle<()>
where
    S: NumberStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick fires immediately and startup already pinged
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.ping().await {
                Ok(()) => debug!("Database health check passed"),
                Err(e) => {
                    metrics::inc_health_check_failures();
                    warn!(error = %e, "Database health check failed");
                }
            }
        }
    })
}
