//! Starboard entries.

use crate::{ChannelId, GuildId, MessageId, PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle of a message on the starboard.
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
pub enum StarboardState {
    /// Not enough reactions to be showcased
    #[default]
    BelowThreshold,
    /// A showcase post exists
    Posted,
    /// Was posted, then dropped below the threshold and the post was removed
    Retracted,
}

/// Starboard bookkeeping for one message.
///
/// `star_count` always equals the size of `distinct_reactor_ids`; mutate
/// reactors through [`StarboardEntry::add_reactor`] and
/// [`StarboardEntry::remove_reactor`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarboardEntry {
    /// Starred message
    pub message_id: MessageId,
    /// Guild of the starred message
    pub guild_id: GuildId,
    /// Channel of the starred message
    pub channel_id: ChannelId,
    /// Author of the starred message, when known
    #[serde(default)]
    pub author_id: Option<UserId>,
    /// Leading text of the starred message, when known
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Number of distinct reactors
    pub star_count: u32,
    /// Users currently reacting with the starboard emoji
    #[serde(default)]
    pub distinct_reactor_ids: BTreeSet<UserId>,
    /// The showcase post, while one exists
    #[serde(default)]
    pub starboard_post_id: Option<PostId>,
    /// Lifecycle state
    #[serde(default)]
    pub state: StarboardState,
    /// Last change
    pub last_updated: DateTime<Utc>,
}

impl StarboardEntry {
    /// Fresh entry with no reactors.
    pub fn new(message_id: MessageId, guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            message_id,
            guild_id,
            channel_id,
            author_id: None,
            excerpt: None,
            star_count: 0,
            distinct_reactor_ids: BTreeSet::new(),
            starboard_post_id: None,
            state: StarboardState::BelowThreshold,
            last_updated: Utc::now(),
        }
    }

    /// Record a reactor. Returns false when they were already counted.
    pub fn add_reactor(&mut self, user: UserId) -> bool {
        let added = self.distinct_reactor_ids.insert(user);
        if added {
            self.sync_count();
        }
        added
    }

    /// Forget a reactor. Returns false when they were not counted.
    pub fn remove_reactor(&mut self, user: UserId) -> bool {
        let removed = self.distinct_reactor_ids.remove(&user);
        if removed {
            self.sync_count();
        }
        removed
    }

    /// Repair an entry whose count drifted from its reactor set (stores
    /// written by older versions, hand-edited state).
    pub fn reconcile(&mut self) {
        let expected = self.reactor_count();
        if self.star_count != expected {
            tracing::warn!(
                message_id = %self.message_id,
                stored = self.star_count,
                expected,
                "Starboard count drifted from reactor set, reconciling"
            );
            self.star_count = expected;
        }
    }

    fn reactor_count(&self) -> u32 {
        u32::try_from(self.distinct_reactor_ids.len()).unwrap_or(u32::MAX)
    }

    fn sync_count(&mut self) {
        self.star_count = self.reactor_count();
        self.last_updated = Utc::now();
    }
}
