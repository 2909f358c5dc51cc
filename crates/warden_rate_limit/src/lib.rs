//! Rate limiting and retry for the Warden moderation engine.
//!
//! - [`KeyedRateLimiter`]: token bucket per guild or user, shared by every caller
//! - [`retry_with_backoff`]: exponential backoff with equal jitter, honouring
//!   platform retry-after hints and an abort check between attempts

#![warn(missing_docs)]

mod config;
mod limiter;
mod retry;

pub use config::{RateLimitConfig, RetryConfig};
pub use limiter::{GuildRateLimiter, KeyedRateLimiter, UserRateLimiter};
pub use retry::{
    RetryError, Retryable, jittered_backoff, nominal_backoff, retry_with_backoff,
};
