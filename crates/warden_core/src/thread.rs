//! Support-thread state.

use crate::{ChannelId, GuildId, ThreadId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution status of a help thread.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreadStatus {
    /// Waiting for help
    #[default]
    Open,
    /// A suggestion was posted
    AiSuggested,
    /// The owner or a moderator marked it solved
    MarkedSolved,
    /// The owner or a moderator said it is not solved
    MarkedUnsolved,
    /// Archived or deleted; terminal
    Closed,
}

impl ThreadStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ThreadStatus::Closed)
    }
}

/// Persistent resolution state of a help thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadState {
    /// Thread id
    pub thread_id: ThreadId,
    /// Guild of the thread
    pub guild_id: GuildId,
    /// Parent forum or channel
    pub parent_channel_id: ChannelId,
    /// Thread owner (author of the opening message)
    pub owner_id: UserId,
    /// Current status
    pub status: ThreadStatus,
    /// When the last suggestion was posted
    #[serde(default)]
    pub last_ai_suggestion_at: Option<DateTime<Utc>>,
    /// Who marked it solved
    #[serde(default)]
    pub solved_by: Option<UserId>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl ThreadState {
    /// Newly observed thread.
    pub fn open(
        thread_id: ThreadId,
        guild_id: GuildId,
        parent_channel_id: ChannelId,
        owner_id: UserId,
    ) -> Self {
        Self {
            thread_id,
            guild_id,
            parent_channel_id,
            owner_id,
            status: ThreadStatus::Open,
            last_ai_suggestion_at: None,
            solved_by: None,
            updated_at: Utc::now(),
        }
    }
}
