// src/storage/retry.rs

//! Retry with exponential backoff for connection-class failures.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (zero-based): `base × 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds, fails with a non-connection error, or the
/// retries are used up.
///
/// `before_retry` runs ahead of every retry; the storage layer uses it to
/// purge stale pooled connections.
pub async fn retry_with_backoff<T, Op, Fut, Hook, HookFut>(
    policy: RetryPolicy,
    mut before_retry: Hook,
    mut op: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    Hook: FnMut() -> HookFut,
    HookFut: Future<Output = ()>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && e.is_connection_error() => {
                let delay = policy.backoff(attempt);
                attempt += 1;
                log::warn!(
                    "Database connection error (retry {}/{} in {:?}): {}",
                    attempt,
                    policy.max_retries,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                before_retry().await;
            }
            Err(e) => {
                if e.is_connection_error() {
                    log::error!("Database connection failed permanently: {}", e);
                }
                return Err(e);
            }
        }
    }
}

/// Simulated connection reset, for tests and fault injection.
pub fn connection_reset() -> AppError {
    AppError::Database(sqlx::Error::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    )))
}
