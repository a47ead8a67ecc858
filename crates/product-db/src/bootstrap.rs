//! One-shot startup: connect to `PostgreSQL` with exponential backoff.
//!
//! [`acquire`] is called once by the embedding process. It blocks the calling
//! task until the store answers a ping or the retry budget is spent, then
//! hands back the [`PostgresConnection`] facade every other component uses.
//! Ongoing health is not retried here; callers check it with
//! [`Connection::is_reachable`].
//!
//! # Schedule
//!
//! ```text
//! attempt 1 fails -> sleep base^1 s
//! attempt 2 fails -> sleep base^2 s
//! ...
//! attempt max_retries + 1 fails -> DbError::Unreachable
//! ```
//!
//! There is no jitter and no cap on a single sleep.
//!
//! [`Connection::is_reachable`]: crate::connection::Connection::is_reachable

use std::future::Future;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::connection::PostgresConnection;
use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Retry budget for the startup connection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first failed attempt.
    pub max_retries: u32,
    /// Base of the exponential delay, in seconds.
    pub backoff_base: u64,
}

impl RetryPolicy {
    /// Create a retry policy.
    pub const fn new(max_retries: u32, backoff_base: u64) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// Saturates at `u64::MAX` seconds instead of overflowing.
    pub const fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds or the retry budget is spent.
///
/// `op` receives the 1-based attempt number. Configuration errors are not
/// retried.
///
/// # Errors
///
/// Returns [`DbError::Unreachable`] carrying the last error once attempt
/// `max_retries + 1` has failed, or the [`DbError::Config`] error as-is.
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, DbError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err @ DbError::Config(_)) => return Err(err),
            Err(err) => {
                if attempt > policy.max_retries {
                    return Err(DbError::Unreachable {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                let delay = policy.delay(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_secs = delay.as_secs(),
                    "PostgreSQL not reachable, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// Connect to the configured store, retrying with backoff, and return the
/// facade.
///
/// Each attempt opens a pool and pings it. Once connected, embedded
/// migrations run when `config.run_migrations` is set; a migration failure
/// is not retried.
///
/// # Errors
///
/// Returns [`DbError::Unreachable`] when every attempt failed,
/// [`DbError::Config`] for an unparseable URL, or [`DbError::Migration`] if
/// migrations fail.
pub async fn acquire(config: &DatabaseConfig) -> Result<PostgresConnection, DbError> {
    let pg_config = config.postgres();
    let pg = &pg_config;

    let pool = retry_with_backoff(config.retry(), move |attempt| async move {
        tracing::debug!(attempt, "Connecting to PostgreSQL");
        let pool = PostgresPool::connect(pg).await?;
        pool.ping().await?;
        Ok(pool)
    })
    .await?;

    if config.run_migrations {
        pool.run_migrations().await?;
    }

    Ok(PostgresConnection::new(pool).with_write_policy(config.write_policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_base_to_the_attempt() {
        let policy = RetryPolicy::new(5, 2);
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(100, 10);
        assert_eq!(policy.delay(64), Duration::from_secs(u64::MAX));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries_plus_one_attempts() {
        let mut seen = Vec::new();
        let result: Result<(), DbError> = retry_with_backoff(RetryPolicy::new(2, 0), |attempt| {
            seen.push(attempt);
            async { Err(DbError::Postgres(sqlx::Error::PoolTimedOut)) }
        })
        .await;

        assert_eq!(seen, vec![1, 2, 3]);
        assert!(matches!(
            result,
            Err(DbError::Unreachable { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let mut calls = 0_u32;
        let result: Result<(), DbError> = retry_with_backoff(RetryPolicy::new(0, 0), |_| {
            calls = calls.saturating_add(1);
            async { Err(DbError::Postgres(sqlx::Error::PoolClosed)) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(DbError::Unreachable { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let mut seen = Vec::new();
        let result = retry_with_backoff(RetryPolicy::new(5, 0), |attempt| {
            seen.push(attempt);
            async move {
                if attempt < 3 {
                    Err(DbError::Postgres(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(seen, vec![1, 2, 3]);
        assert!(matches!(result, Ok(3)));
    }

    #[tokio::test]
    async fn acquire_does_not_retry_a_malformed_url() {
        let config = DatabaseConfig {
            url: "not a url".to_owned(),
            max_retries: 3,
            backoff_base: 0,
            ..DatabaseConfig::default()
        };

        let result = acquire(&config).await;
        assert!(matches!(result, Err(DbError::Config(_))));
    }

    #[tokio::test]
    async fn config_errors_are_not_retried() {
        let mut calls = 0_u32;
        let result: Result<(), DbError> = retry_with_backoff(RetryPolicy::new(5, 0), |_| {
            calls = calls.saturating_add(1);
            async { Err(DbError::Config("bad url".to_owned())) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(DbError::Config(_))));
    }
}
