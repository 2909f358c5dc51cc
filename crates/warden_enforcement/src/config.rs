//! Executor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_core::ChannelId;
use warden_error::ConfigError;
use warden_rate_limit::{RateLimitConfig, RetryConfig};

/// How verdicts are turned into platform calls.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct EnforcementConfig {
    /// Per-guild budget for enforcement calls
    #[serde(default)]
    rate_limit: RateLimitConfig,
    /// Backoff for transient platform failures
    #[serde(default)]
    retry: RetryConfig,
    /// Verdicts waiting per guild before the oldest is dropped
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
    /// Applied (message, action) pairs remembered for de-duplication
    #[serde(default = "default_ledger_capacity")]
    ledger_capacity: usize,
    /// Length of a Timeout action in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    /// Channel receiving enforcement reports
    #[serde(default)]
    mod_log_channel_id: Option<ChannelId>,
    /// Report successful actions too, not only failures
    #[serde(default = "default_true")]
    report_applied: bool,
    /// Warning text; `{user}` becomes a mention, `{reason}` the verdict reason
    #[serde(default = "default_warn_template")]
    warn_template: String,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_ledger_capacity() -> usize {
    10_000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_warn_template() -> String {
    "{user} your message was flagged by moderation: {reason}".to_string()
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            queue_capacity: default_queue_capacity(),
            ledger_capacity: default_ledger_capacity(),
            timeout_secs: default_timeout_secs(),
            mod_log_channel_id: None,
            report_applied: true,
            warn_template: default_warn_template(),
        }
    }
}

impl EnforcementConfig {
    /// Timeout length.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate_limit.validate("enforcement.rate_limit")?;
        self.retry.validate("enforcement.retry")?;
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid_setting(
                "enforcement.queue_capacity",
                "must be at least 1",
            ));
        }
        if self.ledger_capacity == 0 {
            return Err(ConfigError::invalid_setting(
                "enforcement.ledger_capacity",
                "must be at least 1",
            ));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 28 * 24 * 3600 {
            return Err(ConfigError::invalid_setting(
                "enforcement.timeout_secs",
                "must be between 1 second and 28 days",
            ));
        }
        Ok(())
    }
}
