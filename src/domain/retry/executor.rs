//! Retry executor - bounded, classified retry with exponential backoff

use std::future::Future;

use metrics::counter;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use super::{classify, ErrorClass, RetryConfig};
use crate::domain::DomainError;

/// Terminal failure of a retried operation
///
/// Both variants carry the last underlying error unchanged.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("Permanent failure on attempt {attempts}: {source}")]
    Permanent {
        attempts: u32,
        #[source]
        source: DomainError,
    },

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: DomainError,
    },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Permanent { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last underlying error
    pub fn cause(&self) -> &DomainError {
        match self {
            Self::Permanent { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    pub fn into_cause(self) -> DomainError {
        match self {
            Self::Permanent { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Runs fallible async operations with retry
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute with the executor's own configuration
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        self.execute_with(operation, &self.config).await
    }

    /// Execute with an explicit configuration for this call
    pub async fn execute_with<T, F, Fut>(
        &self,
        mut operation: F,
        config: &RetryConfig,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let max_attempts = config.effective_max_attempts();
        let mut attempt = 1;

        loop {
            let result = match config.timeout() {
                Some(limit) => match timeout(limit, operation()).await {
                    Ok(result) => result,
                    Err(_) => Err(DomainError::timeout(config.timeout_ms)),
                },
                None => operation().await,
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if classify(&error) == ErrorClass::Permanent {
                warn!(attempt, error = %error, "Permanent failure, not retrying");
                counter!("matcher_permanent_failures_total").increment(1);
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %error, "Retries exhausted");
                counter!("matcher_retries_exhausted_total").increment(1);
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = config.delay_for_attempt(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retryable failure, backing off"
            );
            counter!("matcher_retry_attempts_total").increment(1);

            sleep(delay).await;
            attempt += 1;
        }
    }
}
