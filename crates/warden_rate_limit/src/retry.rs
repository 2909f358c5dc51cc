//! Retry with exponential backoff and jitter.

use crate::RetryConfig;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use warden_error::{OracleError, PlatformError};

/// Errors that know whether another attempt may help.
pub trait Retryable {
    /// Whether the failed operation may succeed if attempted again.
    fn is_retryable(&self) -> bool;

    /// Minimum delay the remote side asked for.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for PlatformError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_after(&self) -> Option<Duration> {
        self.kind.retry_after()
    }
}

impl Retryable for OracleError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last: E,
    },
    /// An attempt failed with a non-retryable error
    Permanent {
        /// Attempts made
        attempts: u32,
        /// The terminal error
        error: E,
    },
    /// The caller asked to stop between attempts
    Aborted {
        /// Attempts made before stopping
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. }
            | RetryError::Permanent { attempts, .. }
            | RetryError::Aborted { attempts } => *attempts,
        }
    }

    /// The underlying error, unless the retry was aborted.
    pub fn into_error(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Permanent { error, .. } => Some(error),
            RetryError::Aborted { .. } => None,
        }
    }
}

/// Nominal delay after `attempt` (1-based) failed, before jitter.
pub fn nominal_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32) as i32;
    let millis = (*config.initial_backoff_ms() as f64) * config.multiplier().powi(exponent);
    let capped = millis.min(*config.max_backoff_ms() as f64);
    Duration::from_millis(capped as u64)
}

/// Equal jitter: half the nominal delay plus a random share of the other half.
pub fn jittered_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let nominal = nominal_backoff(config, attempt).as_millis() as u64;
    let half = nominal / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

/// Run `operation` until it succeeds, fails permanently, runs out of attempts
/// or `should_abort` returns true. Returns the value and the attempts it took.
///
/// A retry-after hint from the error raises the delay; it never shortens it.
#[instrument(skip(config, should_abort, operation), fields(max_attempts = config.max_attempts()))]
pub async fn retry_with_backoff<T, E, F, Fut, A>(
    config: &RetryConfig,
    op_name: &str,
    should_abort: A,
    mut operation: F,
) -> Result<(T, u32), RetryError<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    A: Fn() -> bool,
{
    let max_attempts = (*config.max_attempts()).max(1);
    let mut attempt = 0;

    loop {
        if should_abort() {
            debug!(attempt, "Retry aborted by caller");
            return Err(RetryError::Aborted { attempts: attempt });
        }

        attempt += 1;
        debug!(attempt, "Executing operation");

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok((value, attempt));
            }
            Err(err) if !err.is_retryable() => {
                warn!(attempt, error = %err, "Error is not retryable, failing immediately");
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    error: err,
                });
            }
            Err(err) if attempt >= max_attempts => {
                warn!(attempt, error = %err, "All retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(err) => {
                let mut delay = jittered_backoff(config, attempt);
                if let Some(hint) = err.retry_after() {
                    delay = delay.max(hint);
                }
                debug!(
                    attempt,
                    error = %err,
                    backoff_ms = delay.as_millis() as u64,
                    "Retrying after failure"
                );
                sleep(delay).await;
            }
        }
    }
}
