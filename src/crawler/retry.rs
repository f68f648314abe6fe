//! Bounded retry for transient failures
//!
//! Errors that can be retried implement [`Transient`]. The [`RetryPolicy`]
//! re-runs an operation immediately while it fails transiently, up to a fixed
//! number of attempts, and stops at the first permanent failure.

use std::future::Future;
use thiserror::Error;

/// Classifies an error as worth retrying or not
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Final failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Every attempt failed transiently
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// An attempt failed with an error that retrying cannot fix
    #[error("permanent failure on attempt {attempt}: {source}")]
    Permanent { attempt: u32, source: E },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of attempts that were made
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Permanent { attempt, .. } => *attempt,
        }
    }

    /// The error returned by the last attempt
    pub fn last_error(&self) -> &E {
        match self {
            Self::Exhausted { source, .. } | Self::Permanent { source, .. } => source,
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy; a bound of zero is treated as one attempt
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `op` until it succeeds, fails permanently, or the bound is hit
    ///
    /// `op` receives the 1-based attempt number. Attempts run back to back
    /// with no delay. `label` identifies the work item in log output.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::error::Error + 'static,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(item = label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    tracing::warn!(item = label, attempt, error = %e, "permanent failure");
                    return Err(RetryError::Permanent { attempt, source: e });
                }
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        item = label,
                        attempts = attempt,
                        error = %e,
                        "giving up after exhausting retries"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        item = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "transient failure, retrying"
                    );
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
