//! Strongly typed identifiers.
//!
//! Platform ids are 64-bit snowflakes. Wrapping them keeps a channel id from
//! being passed where a message id is expected.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Guild (server) identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct GuildId(pub u64);

/// Channel identifier. Threads are channels too.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

/// User (member) identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Message identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct MessageId(pub u64);

/// Role identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct RoleId(pub u64);

/// Forum / help thread identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl From<ThreadId> for ChannelId {
    fn from(thread: ThreadId) -> Self {
        ChannelId(thread.0)
    }
}

/// Blocklist rule identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        RuleId(id.to_string())
    }
}

/// Identifier of an ingested event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    /// Fresh random event id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

/// A message posted by the bot, addressable without further lookups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display("{channel_id}/{message_id}")]
pub struct PostId {
    /// Channel the post lives in
    pub channel_id: ChannelId,
    /// Message id of the post
    pub message_id: MessageId,
}

impl PostId {
    /// Create a post id.
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

/// Ordering key for ingested events: one lane per (guild, channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{guild_id}:{channel_id}")]
pub struct LaneKey {
    /// Guild of the lane
    pub guild_id: GuildId,
    /// Channel of the lane
    pub channel_id: ChannelId,
}

/// Jump link to a message in the Discord client.
pub fn jump_url(guild: GuildId, channel: ChannelId, message: MessageId) -> String {
    format!("https://discord.com/channels/{guild}/{channel}/{message}")
}
