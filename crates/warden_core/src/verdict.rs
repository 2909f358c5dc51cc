//! Moderation verdicts.

use crate::{Action, ChannelId, GuildId, MessageId, RuleHit, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The decided enforcement action for a message plus its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    /// Message the verdict is about
    pub message_id: MessageId,
    /// Guild of the message
    pub guild_id: GuildId,
    /// Channel of the message
    pub channel_id: ChannelId,
    /// Author of the message
    pub author_id: UserId,
    /// Whether any blocklist rule matched
    pub blocklist_hit: bool,
    /// Rules that matched
    #[serde(default)]
    pub rule_hits: Vec<RuleHit>,
    /// Classifier score; absent when the classifier was skipped or unavailable
    pub classifier_score: Option<f32>,
    /// Decided action
    pub action: Action,
    /// Human readable justification
    pub reason: String,
    /// When the verdict was reached
    pub decided_at: DateTime<Utc>,
}
