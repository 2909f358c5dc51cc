//! Starboard configuration.

use serde::{Deserialize, Serialize};
use warden_core::ChannelId;
use warden_error::ConfigError;
use warden_rate_limit::RetryConfig;

/// When and where messages are showcased.
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
pub struct StarboardConfig {
    /// Reaction that counts as a star
    #[serde(default = "default_emoji")]
    emoji: String,
    /// Distinct reactors needed for a showcase post
    #[serde(default = "default_threshold")]
    threshold: u32,
    /// Showcase channel; without one reactions are counted but nothing is posted
    #[serde(default)]
    channel_id: Option<ChannelId>,
    /// Delete the showcase post when the count falls below the threshold
    #[serde(default)]
    retract_on_drop: bool,
    /// Ignore authors starring their own messages
    #[serde(default)]
    ignore_self_stars: bool,
    /// Characters of the source message quoted in the post
    #[serde(default = "default_excerpt_chars")]
    excerpt_chars: usize,
    /// Backoff for showcase post calls
    #[serde(default)]
    retry: RetryConfig,
}

fn default_emoji() -> String {
    "⭐".to_string()
}

fn default_threshold() -> u32 {
    5
}

fn default_excerpt_chars() -> usize {
    300
}

impl Default for StarboardConfig {
    fn default() -> Self {
        Self {
            emoji: default_emoji(),
            threshold: default_threshold(),
            channel_id: None,
            retract_on_drop: false,
            ignore_self_stars: false,
            excerpt_chars: default_excerpt_chars(),
            retry: RetryConfig::default(),
        }
    }
}

impl StarboardConfig {
    /// Validate the threshold and emoji.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::invalid_setting(
                "starboard.threshold",
                "must be at least 1",
            ));
        }
        if self.emoji.trim().is_empty() {
            return Err(ConfigError::invalid_setting(
                "starboard.emoji",
                "must not be empty",
            ));
        }
        self.retry.validate("starboard.retry")
    }
}
