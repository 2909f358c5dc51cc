//! Core data model for the Warden moderation engine.
//!
//! Everything here is plain data: identifiers, inbound events, verdicts,
//! blocklist rules, starboard entries and thread state. Behavior lives in the
//! pipeline crates.

#![warn(missing_docs)]

mod action;
mod blocklist;
mod event;
mod ids;
mod observability;
mod score;
mod starboard;
mod thread;
mod verdict;

pub use action::Action;
pub use blocklist::{BlocklistRule, PatternKind, RuleHit, Severity};
pub use event::{
    Event, EventKind, EventPayload, MessagePayload, ReactionPayload, ThreadMarker,
    ThreadMessagePayload,
};
pub use ids::{
    ChannelId, EventId, GuildId, LaneKey, MessageId, PostId, RoleId, RuleId, ThreadId, UserId,
    jump_url,
};
pub use observability::{LogFormat, LoggingConfig, init_tracing};
pub use score::{ClassifierOutcome, Score, Suggestion, SuggestionOutcome, ThreadContext};
pub use starboard::{StarboardEntry, StarboardState};
pub use thread::{ThreadState, ThreadStatus};
pub use verdict::ModerationVerdict;
