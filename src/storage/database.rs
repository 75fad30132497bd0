// src/storage/database.rs

//! PostgreSQL access: one bounded pool, a health probe and retried queries.

use std::future::Future;

use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::Connection;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use super::convert::{JsonRow, bind_all, row_to_json};
use super::retry::{RetryPolicy, retry_with_backoff};
use crate::error::{AppError, Result};
use crate::models::DatabaseConfig;

/// Live pool plus its health-check task.
struct PoolState {
    pool: PgPool,
    shutdown: watch::Sender<bool>,
    health: JoinHandle<()>,
}

/// Handle to the connection pool.
///
/// Created empty; [`Database::initialize`] opens the pool and
/// [`Database::close`] releases it.
pub struct Database {
    config: DatabaseConfig,
    state: RwLock<Option<PoolState>>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.max_retries, self.config.retry_base_delay())
    }

    /// Open the pool and start the health probe.
    ///
    /// A second call is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.is_some() {
            log::warn!("Database pool already initialized; ignoring");
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .min_connections(self.config.min_connections)
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.acquire_timeout())
            .test_before_acquire(true)
            .connect(&self.config.url)
            .await?;

        let (shutdown, signal) = watch::channel(false);
        let health = spawn_health_check(pool.clone(), self.config.health_check_interval(), signal);

        log::info!(
            "Database pool ready ({}..{} connections)",
            self.config.min_connections,
            self.config.max_connections
        );
        *state = Some(PoolState {
            pool,
            shutdown,
            health,
        });
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Stop the health probe, wait for it, then release all connections.
    pub async fn close(&self) {
        let Some(state) = self.state.write().await.take() else {
            return;
        };
        let _ = state.shutdown.send(true);
        if let Err(e) = state.health.await {
            log::warn!("Health check task ended abnormally: {}", e);
        }
        state.pool.close().await;
        log::info!("Database pool closed");
    }

    async fn pool(&self) -> Result<PgPool> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.pool.clone())
            .ok_or(AppError::PoolNotInitialized)
    }

    /// Run `f` on one pooled connection.
    ///
    /// A connection that failed with a connection-class error is closed
    /// instead of being returned to the pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>>,
    {
        let pool = self.pool().await?;
        let mut conn = pool.acquire().await?;
        let result = f(&mut *conn).await;
        if let Err(e) = &result {
            if e.is_connection_error() {
                log::debug!("Discarding broken connection: {}", e);
                let _ = conn.close().await;
            }
        }
        result
    }

    pub async fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<Option<JsonRow>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_connection(move |conn| {
            Box::pin(async move {
                let row = bind_all(sqlx::query(&sql), &params)
                    .fetch_optional(&mut *conn)
                    .await?;
                row.as_ref().map(row_to_json).transpose()
            })
        })
        .await
    }

    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<JsonRow>> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_connection(move |conn| {
            Box::pin(async move {
                let rows = bind_all(sqlx::query(&sql), &params)
                    .fetch_all(&mut *conn)
                    .await?;
                rows.iter().map(row_to_json).collect()
            })
        })
        .await
    }

    /// Run one statement; returns the affected row count.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_connection(move |conn| Box::pin(execute_on(conn, sql, params)))
            .await
    }

    /// Run one statement per parameter set inside a single transaction.
    pub async fn execute_many(&self, sql: &str, param_sets: &[Vec<Value>]) -> Result<u64> {
        let sql = sql.to_string();
        let param_sets = param_sets.to_vec();
        self.transaction(move |conn| {
            Box::pin(async move {
                let mut affected = 0;
                for params in param_sets {
                    affected += execute_on(conn, sql.clone(), params).await?;
                }
                Ok(affected)
            })
        })
        .await
    }

    /// Run `f` in a transaction: commit on `Ok`, roll back on `Err`.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>>,
    {
        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;
        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    log::warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// Ping idle connections and close the ones that no longer answer.
    pub async fn purge_stale(&self) {
        let Ok(pool) = self.pool().await else {
            return;
        };

        let mut healthy = Vec::new();
        let mut closed = 0;
        for _ in 0..pool.num_idle() {
            let Some(mut conn) = pool.try_acquire() else {
                break;
            };
            if conn.ping().await.is_ok() {
                healthy.push(conn);
            } else {
                let _ = conn.close().await;
                closed += 1;
            }
        }
        drop(healthy);

        if closed > 0 {
            log::info!("Purged {} stale connection(s)", closed);
        }
    }

    /// Retry `op` on connection-class failures, purging stale
    /// connections before every retry.
    pub async fn execute_with_retry<T, Op, Fut>(&self, op: Op) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_with_backoff(self.retry_policy(), || self.purge_stale(), op).await
    }
}

/// Execute one statement on a borrowed connection.
pub async fn execute_on(conn: &mut PgConnection, sql: String, params: Vec<Value>) -> Result<u64> {
    let done = bind_all(sqlx::query(&sql), &params)
        .execute(&mut *conn)
        .await?;
    Ok(done.rows_affected())
}

fn spawn_health_check(
    pool: PgPool,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match sqlx::query("SELECT 1").execute(&pool).await {
                        Ok(_) => log::debug!(
                            "Database health check ok ({} idle / {} open)",
                            pool.num_idle(),
                            pool.size()
                        ),
                        Err(e) => log::warn!("Database health check failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        log::debug!("Database health check stopped");
    })
}
