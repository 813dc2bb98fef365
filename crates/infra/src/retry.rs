//! Bounded retry with a fixed delay schedule.
//!
//! Each call to [`RetryPolicy::run`] gets a fresh attempt budget of
//! `delays.len() + 1` attempts. Waits race the shutdown signal.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::shutdown::Shutdown;

/// Delays used when a policy is built from an empty list.
pub const DEFAULT_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(5),
];

/// Decides whether a failed attempt may be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Shutdown fired before an attempt or during a backoff wait.
    #[error("operation cancelled")]
    Cancelled,

    /// The last error seen, either non-retryable or after the budget ran out.
    #[error("{0}")]
    Operation(E),
}

pub struct RetryPolicy<E> {
    delays: Vec<Duration>,
    retryable: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Build a policy from a delay schedule; empty means [`DEFAULT_DELAYS`].
    /// Every error is retryable until a predicate is attached.
    pub fn new(delays: Vec<Duration>) -> Self {
        let delays = if delays.is_empty() {
            DEFAULT_DELAYS.to_vec()
        } else {
            delays
        };
        Self {
            delays,
            retryable: None,
        }
    }

    /// Build from signed milliseconds; negative values become zero.
    pub fn from_millis(delays_ms: &[i64]) -> Self {
        Self::new(
            delays_ms
                .iter()
                .map(|ms| Duration::from_millis((*ms).max(0) as u64))
                .collect(),
        )
    }

    pub fn with_predicate<F>(mut self, retryable: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retryable = Some(Arc::new(retryable));
        self
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Total attempts a single `run` may make.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    pub fn is_retryable(&self, err: &E) -> bool {
        self.retryable.as_ref().is_none_or(|f| f(err))
    }

    /// Run `action` until it succeeds, fails with a non-retryable error, runs
    /// out of attempts, or shutdown fires.
    pub async fn run<T, F, Fut>(&self, shutdown: &Shutdown, mut action: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 0usize;
        loop {
            if shutdown.is_triggered() {
                return Err(RetryError::Cancelled);
            }

            let err = match action().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.is_retryable(&err) || attempt >= self.delays.len() {
                return Err(RetryError::Operation(err));
            }

            let delay = self.delays[attempt];
            attempt += 1;
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retryable failure, backing off"
            );

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = shutdown.triggered() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            delays: self.delays.clone(),
            retryable: self.retryable.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("delays", &self.delays)
            .field("has_predicate", &self.retryable.is_some())
            .finish()
    }
}
