//! Retrying query executor.
//!
//! Every directory operation runs inside its own transaction. A failed
//! attempt is rolled back, logged, and retried after a fixed non-blocking
//! backoff. Once the attempts are used up the executor logs a single
//! exhaustion event and yields `None`; it never returns the error.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use beacon_common::{DispatchConfig, Metrics, get_metrics};
use futures::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tracing::{error, warn};

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait between two attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

impl From<&DispatchConfig> for RetryPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts,
            backoff: config.retry_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Attempts actually made; a zero setting still runs once.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted.
///
/// `attempt` receives the 1-based attempt number. The backoff is skipped
/// after the final failure.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    metrics: &Metrics,
    operation: &str,
    mut attempt: F,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.attempts();

    for n in 1..=max_attempts {
        match attempt(n).await {
            Ok(value) => return Some(value),
            Err(e) => {
                let exhausted = n == max_attempts;
                metrics.record_directory_failure(exhausted);
                warn!(
                    operation,
                    attempt = n,
                    max_attempts,
                    error = %e,
                    "Directory operation failed"
                );
                if !exhausted {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    error!(
        operation,
        attempts = max_attempts,
        "Directory operation exhausted all attempts, giving up"
    );
    None
}

/// Runs directory operations in scoped transactions with retries.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<DatabaseConnection>,
    policy: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl QueryExecutor {
    /// Create an executor using the global metrics.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, policy: RetryPolicy) -> Self {
        Self {
            db,
            policy,
            metrics: Arc::clone(get_metrics()),
        }
    }

    /// Use a dedicated metrics collector.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The active retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `op` with retries, returning `None` once every attempt failed.
    ///
    /// Each attempt opens a fresh transaction which is committed on success
    /// and rolled back on failure before the next attempt starts.
    pub async fn execute<T, F>(&self, operation: &str, op: F) -> Option<T>
    where
        T: Send,
        F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, DbErr>> + Send + Sync,
    {
        retry_with_backoff(&self.policy, &self.metrics, operation, |_| {
            self.run_scoped(operation, &op)
        })
        .await
    }

    async fn run_scoped<T, F>(&self, operation: &str, op: &F) -> Result<T, DbErr>
    where
        T: Send,
        F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, DbErr>> + Send + Sync,
    {
        let txn = self.db.begin().await?;
        match op(&txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(operation, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}
