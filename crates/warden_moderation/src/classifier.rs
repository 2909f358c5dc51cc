//! Fail-open wrapper around the AI oracle.

use crate::ClassifierConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use warden_core::{ClassifierOutcome, SuggestionOutcome, ThreadContext, UserId};
use warden_error::{ConfigError, OracleError, OracleErrorKind};
use warden_interface::ModerationOracle;
use warden_rate_limit::{
    RateLimitConfig, RetryConfig, RetryError, UserRateLimiter, retry_with_backoff,
};

/// Calls the oracle under a deadline and at most one retry, and never fails:
/// every problem becomes [`ClassifierOutcome::Unavailable`].
pub struct ClassifierAdapter {
    oracle: Arc<dyn ModerationOracle>,
    config: ClassifierConfig,
    retry: RetryConfig,
    cooldown: Option<UserRateLimiter>,
}

impl std::fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("oracle", &self.oracle.oracle_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClassifierAdapter {
    /// Wrap `oracle`.
    pub fn new(
        oracle: Arc<dyn ModerationOracle>,
        config: ClassifierConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let cooldown = match *config.user_calls_per_window() {
            0 => None,
            calls => Some(UserRateLimiter::new(&RateLimitConfig::per_window(
                calls,
                *config.user_window_secs(),
            ))?),
        };
        let retry = RetryConfig::default()
            .with_max_attempts(config.max_retries() + 1)
            .with_initial_backoff_ms(*config.retry_backoff_ms())
            .with_max_backoff_ms(*config.retry_backoff_ms());
        Ok(Self {
            oracle,
            config,
            retry,
            cooldown,
        })
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Score `text` written by `author`.
    ///
    /// Returns `Skipped` for empty text or when the author exhausted their
    /// classifier budget, `Unavailable` on timeout, repeated transient failure,
    /// permanent failure or a non-finite score.
    #[instrument(skip(self, text), fields(author = %author, oracle = self.oracle.oracle_name()))]
    pub async fn classify(&self, author: UserId, text: &str) -> ClassifierOutcome {
        if text.trim().is_empty() {
            return ClassifierOutcome::Skipped;
        }
        if let Some(cooldown) = &self.cooldown
            && cooldown.try_acquire(&author).is_err()
        {
            debug!("Classifier cooldown active, skipping");
            return ClassifierOutcome::Skipped;
        }

        let deadline = Duration::from_millis(*self.config.timeout_ms());
        let result = retry_with_backoff(&self.retry, "classify", || false, move || async move {
            match tokio::time::timeout(deadline, self.oracle.classify(text)).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::new(OracleErrorKind::Timeout(
                    *self.config.timeout_ms(),
                ))),
            }
        })
        .await;

        match result {
            Ok((score, attempts)) => {
                if !score.is_finite() {
                    warn!("Oracle returned a non-finite score, ignoring");
                    return ClassifierOutcome::Unavailable;
                }
                let focused = score.focused(self.config.categories());
                debug!(score = focused, attempts, "Classified");
                ClassifierOutcome::Scored { score: focused }
            }
            Err(err) => {
                log_unavailable(&err);
                ClassifierOutcome::Unavailable
            }
        }
    }

    /// Ask the oracle for a help-thread answer under the suggestion deadline.
    #[instrument(skip(self, thread), fields(thread_id = %thread.thread_id))]
    pub async fn suggest_solution(&self, thread: &ThreadContext) -> SuggestionOutcome {
        let deadline = Duration::from_millis(*self.config.suggestion_timeout_ms());
        let result = retry_with_backoff(&self.retry, "suggest_solution", || false, move || async move {
            match tokio::time::timeout(deadline, self.oracle.suggest_solution(thread)).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::new(OracleErrorKind::Timeout(
                    *self.config.suggestion_timeout_ms(),
                ))),
            }
        })
        .await;

        match result {
            Ok((suggestion, _)) if !suggestion.text.trim().is_empty() => {
                SuggestionOutcome::Suggested(suggestion)
            }
            Ok(_) => {
                debug!("Oracle returned an empty suggestion");
                SuggestionOutcome::Unavailable
            }
            Err(err) => {
                log_unavailable(&err);
                SuggestionOutcome::Unavailable
            }
        }
    }
}

fn log_unavailable(err: &RetryError<OracleError>) {
    match err {
        RetryError::Exhausted { attempts, last } => {
            warn!(attempts, error = %last, "Oracle unavailable after retries")
        }
        RetryError::Permanent { error, .. } => {
            warn!(error = %error, "Oracle unavailable")
        }
        RetryError::Aborted { .. } => debug!("Oracle call aborted"),
    }
}
