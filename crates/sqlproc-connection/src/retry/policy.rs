//! Retry policy and connection factories

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use sqlproc_core::{Connection, Result};

use super::BackoffStrategy;

/// How many times, and how patiently, a failed connection is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. 0 means fail on the first error.
    max_attempts: u32,
    backoff: BackoffStrategy,
    /// Re-run the statement that hit a lost connection once the connection
    /// is back. Off by default: a statement may have taken effect before the
    /// link dropped.
    replay_statements: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts,
            backoff,
            replay_statements: false,
        }
    }

    /// Fail on the first error
    pub fn no_retry() -> Self {
        Self::new(0, BackoffStrategy::default())
    }

    pub fn with_replay_statements(mut self, replay: bool) -> Self {
        self.replay_statements = replay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    pub fn replay_statements(&self) -> bool {
        self.replay_statements
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, BackoffStrategy::default().with_jitter(true))
    }
}

/// Creates fresh connections for [`connect_with_retry`] and
/// [`super::ReconnectingConnection`].
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    async fn create(&self) -> Result<Arc<dyn Connection>>;

    /// Short description for log output
    fn describe(&self) -> String {
        "connection".to_string()
    }
}

/// Run `operation` until it succeeds, fails with a non-connection error,
/// or has been retried `policy.max_attempts()` times.
///
/// The closure receives the 0-based attempt number. Only errors for which
/// [`sqlproc_core::SqlProcError::is_connection_error`] holds are retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_connection_error() && attempt < policy.max_attempts() => {
                let delay = policy.backoff().calculate_delay(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_connection_error() {
                    tracing::error!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        error = %err,
                        "giving up"
                    );
                }
                return Err(err);
            }
        }
    }
}

/// Create a connection through `factory`, retrying connection failures.
pub async fn connect_with_retry<F>(factory: &F, policy: &RetryPolicy) -> Result<Arc<dyn Connection>>
where
    F: ConnectionFactory + ?Sized,
{
    let description = factory.describe();
    with_retry(policy, &description, |_| factory.create()).await
}
