//! Enforcement stage of the Warden moderation engine.
//!
//! [`ActionExecutor`] applies [`warden_core::ModerationVerdict`]s through a
//! [`warden_interface::PlatformAdapter`]:
//!
//! - at most one application per (message, action)
//! - per-guild token bucket with a bounded drop-oldest queue behind it
//! - transient failures retried with jittered backoff; permanent ones reported
//! - composite sanctions: Timeout and Ban delete the message first

#![warn(missing_docs)]

mod config;
mod executor;
mod ledger;
mod report;

pub use config::EnforcementConfig;
pub use executor::{ActionExecutor, ExecutionResult};
pub use ledger::ActionKey;
pub use report::{render_log_line, render_warning};
