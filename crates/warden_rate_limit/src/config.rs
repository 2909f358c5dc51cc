//! Rate limit and retry configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_error::ConfigError;

/// Token bucket parameters: `actions_per_window` tokens refill evenly over
/// `window_secs`, and at most `burst` may be spent at once.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct RateLimitConfig {
    /// Tokens refilled per window
    #[serde(default = "default_actions_per_window")]
    actions_per_window: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    window_secs: u64,
    /// Bucket size
    #[serde(default = "default_burst")]
    burst: u32,
}

fn default_actions_per_window() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    5
}

fn default_burst() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            actions_per_window: default_actions_per_window(),
            window_secs: default_window_secs(),
            burst: default_burst(),
        }
    }
}

impl RateLimitConfig {
    /// Bucket of `actions` tokens per `window_secs`, burst equal to `actions`.
    pub fn per_window(actions: u32, window_secs: u64) -> Self {
        Self {
            actions_per_window: actions,
            window_secs,
            burst: actions,
        }
    }

    /// Time to refill one token.
    pub fn replenish_interval(&self) -> Duration {
        let window = Duration::from_secs(self.window_secs);
        window / self.actions_per_window.max(1)
    }

    /// Reject zero-sized buckets and windows. `key` names the section in errors.
    pub fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if self.actions_per_window == 0 {
            return Err(ConfigError::invalid_setting(
                format!("{key}.actions_per_window"),
                "must be at least 1",
            ));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::invalid_setting(
                format!("{key}.window_secs"),
                "must be at least 1",
            ));
        }
        if self.burst == 0 {
            return Err(ConfigError::invalid_setting(
                format!("{key}.burst"),
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Exponential backoff parameters.
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
pub struct RetryConfig {
    /// Attempts including the first
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,
    /// Delay cap, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
    /// Growth factor between retries
    #[serde(default = "default_multiplier")]
    multiplier: f64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay before the first retry.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Delay cap.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Reject configurations that would never attempt or never grow sensibly.
    pub fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid_setting(
                format!("{key}.max_attempts"),
                "must be at least 1",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::invalid_setting(
                format!("{key}.multiplier"),
                "must be a finite number >= 1.0",
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::invalid_setting(
                format!("{key}.max_backoff_ms"),
                "must not be below initial_backoff_ms",
            ));
        }
        Ok(())
    }
}
