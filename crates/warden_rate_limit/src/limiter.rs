//! Keyed token buckets.
//!
//! One GCRA bucket per key (guild, user), backed by governor's keyed limiter.
//! Bucket updates are lock-free compare-and-swap, so every caller sharing a
//! key observes the same budget.

use crate::RateLimitConfig;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::hash::Hash;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use warden_core::{GuildId, UserId};
use warden_error::ConfigError;

type KeyedGovernor<K> = GovernorRateLimiter<K, DefaultKeyedStateStore<K>, DefaultClock>;

/// Token bucket per key.
pub struct KeyedRateLimiter<K>
where
    K: Hash + Eq + Clone,
{
    limiter: KeyedGovernor<K>,
    clock: DefaultClock,
    config: RateLimitConfig,
}

/// Per-guild enforcement budget.
pub type GuildRateLimiter = KeyedRateLimiter<GuildId>;

/// Per-user budget.
pub type UserRateLimiter = KeyedRateLimiter<UserId>;

impl<K> std::fmt::Debug for KeyedRateLimiter<K>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<K> KeyedRateLimiter<K>
where
    K: Hash + Eq + Clone,
{
    /// Build a limiter. Fails on zero-sized buckets or windows.
    pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        config.validate("rate_limit")?;
        let burst = NonZeroU32::new(*config.burst())
            .ok_or_else(|| ConfigError::invalid_setting("rate_limit.burst", "must be at least 1"))?;
        let quota = Quota::with_period(config.replenish_interval())
            .ok_or_else(|| {
                ConfigError::invalid_setting("rate_limit.window_secs", "refill period is zero")
            })?
            .allow_burst(burst);

        debug!(
            actions_per_window = config.actions_per_window(),
            window_secs = config.window_secs(),
            burst = config.burst(),
            "Creating keyed rate limiter"
        );

        Ok(Self {
            limiter: GovernorRateLimiter::keyed(quota),
            clock: DefaultClock::default(),
            config: config.clone(),
        })
    }

    /// Take a token if one is free. On refusal returns how long until one is.
    pub fn try_acquire(&self, key: &K) -> Result<(), Duration> {
        self.limiter
            .check_key(key)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Wait until a token is free and take it.
    pub async fn acquire(&self, key: &K) {
        self.limiter.until_key_ready(key).await;
    }

    /// Drop buckets that have fully refilled; they are indistinguishable from new ones.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    /// Number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
