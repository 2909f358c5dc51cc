//! Detection stage of the Warden moderation engine.
//!
//! - [`LinkSanitizer`]: strips tracking parameters from links
//! - [`BlocklistMatcher`]: versioned rule set with atomic snapshot swap
//! - [`ClassifierAdapter`]: fail-open oracle wrapper with deadline and retry
//! - [`RepeatTracker`]: same content from one author across channels
//! - [`VerdictEngine`]: fuses the signals into a [`warden_core::ModerationVerdict`]

#![warn(missing_docs)]

mod blocklist;
mod classifier;
mod config;
mod link;
mod repeat;
mod verdict;

pub use blocklist::{BlocklistMatcher, BlocklistSnapshot};
pub use classifier::ClassifierAdapter;
pub use config::{ClassifierConfig, LinkConfig, ModerationConfig, RepeatConfig, Thresholds};
pub use link::{CleanedLink, LinkSanitizer, extract_urls};
pub use repeat::{RepeatHit, RepeatTracker};
pub use verdict::{Decision, Disposition, Fusion, VerdictEngine};
