//! Normalized inbound events.
//!
//! The transport adapter turns gateway traffic into [`Event`]s. Once ingested an
//! event is immutable; the pipeline only ever reads it.

use crate::{ChannelId, EventId, GuildId, LaneKey, MessageId, RoleId, ThreadId, UserId};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// A message was posted in a regular channel
    MessageCreated,
    /// A message was edited
    MessageEdited,
    /// A reaction was added to a message
    ReactionAdded,
    /// A reaction was removed from a message
    ReactionRemoved,
    /// A message was posted in a forum / help thread
    ThreadMessage,
}

/// Message body and the author facts moderation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Message id
    pub message_id: MessageId,
    /// Raw message text
    pub content: String,
    /// Attachment file names
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Whether the author is a bot account
    #[serde(default)]
    pub author_is_bot: bool,
    /// Roles held by the author
    #[serde(default)]
    pub author_roles: Vec<RoleId>,
}

/// A reaction add or remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionPayload {
    /// Message the reaction is on
    pub message_id: MessageId,
    /// Emoji as rendered (unicode or `name:id`)
    pub emoji: String,
    /// Who reacted
    pub reactor_id: UserId,
    /// Author of the reacted message, when the transport knows it
    #[serde(default)]
    pub message_author_id: Option<UserId>,
    /// Leading text of the reacted message, used for showcase posts
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// Explicit support-thread resolution markers (button presses, commands).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreadMarker {
    /// "Mark as solved"
    Solved,
    /// "This didn't help"
    Unsolved,
}

/// A message inside a forum / help thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessagePayload {
    /// Thread the message belongs to
    pub thread_id: ThreadId,
    /// Forum or text channel the thread hangs off
    pub parent_channel_id: ChannelId,
    /// The message itself
    pub message: MessagePayload,
    /// Thread title, present on the opening message
    #[serde(default)]
    pub title: Option<String>,
    /// Resolution marker carried by this message
    #[serde(default)]
    pub marker: Option<ThreadMarker>,
}

/// Kind-specific event body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Created or edited message
    Message(MessagePayload),
    /// Added or removed reaction
    Reaction(ReactionPayload),
    /// Help-thread message
    ThreadMessage(ThreadMessagePayload),
}

/// A normalized, immutable inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Event {
    /// Event id assigned by the transport
    #[serde(default = "EventId::generate")]
    id: EventId,
    /// Guild the event happened in
    guild_id: GuildId,
    /// Channel the event happened in
    channel_id: ChannelId,
    /// User who caused the event
    author_id: UserId,
    /// What happened
    kind: EventKind,
    /// Kind-specific body
    payload: EventPayload,
    /// When the platform says it happened
    #[serde(default = "Utc::now")]
    occurred_at: DateTime<Utc>,
}

impl Event {
    /// Create an event, stamping a fresh id and the current time.
    pub fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        author_id: UserId,
        kind: EventKind,
        payload: EventPayload,
    ) -> Self {
        Self {
            id: EventId::generate(),
            guild_id,
            channel_id,
            author_id,
            kind,
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Override the occurrence time (replays, tests).
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// A newly posted channel message.
    pub fn message_created(
        guild_id: GuildId,
        channel_id: ChannelId,
        author_id: UserId,
        message: MessagePayload,
    ) -> Self {
        Self::new(
            guild_id,
            channel_id,
            author_id,
            EventKind::MessageCreated,
            EventPayload::Message(message),
        )
    }

    /// An edited channel message.
    pub fn message_edited(
        guild_id: GuildId,
        channel_id: ChannelId,
        author_id: UserId,
        message: MessagePayload,
    ) -> Self {
        Self::new(
            guild_id,
            channel_id,
            author_id,
            EventKind::MessageEdited,
            EventPayload::Message(message),
        )
    }

    /// A reaction added by `reaction.reactor_id`.
    pub fn reaction_added(guild_id: GuildId, channel_id: ChannelId, reaction: ReactionPayload) -> Self {
        let author_id = reaction.reactor_id;
        Self::new(
            guild_id,
            channel_id,
            author_id,
            EventKind::ReactionAdded,
            EventPayload::Reaction(reaction),
        )
    }

    /// A reaction removed by `reaction.reactor_id`.
    pub fn reaction_removed(
        guild_id: GuildId,
        channel_id: ChannelId,
        reaction: ReactionPayload,
    ) -> Self {
        let author_id = reaction.reactor_id;
        Self::new(
            guild_id,
            channel_id,
            author_id,
            EventKind::ReactionRemoved,
            EventPayload::Reaction(reaction),
        )
    }

    /// A message inside a help thread. The event's channel is the thread.
    pub fn thread_message(
        guild_id: GuildId,
        author_id: UserId,
        thread: ThreadMessagePayload,
    ) -> Self {
        let channel_id = ChannelId::from(thread.thread_id);
        Self::new(
            guild_id,
            channel_id,
            author_id,
            EventKind::ThreadMessage,
            EventPayload::ThreadMessage(thread),
        )
    }

    /// Ordering lane of this event.
    pub fn lane(&self) -> LaneKey {
        LaneKey {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
        }
    }

    /// Whether kind and payload agree. Deserialized events must be checked.
    pub fn is_consistent(&self) -> bool {
        matches!(
            (&self.kind, &self.payload),
            (
                EventKind::MessageCreated | EventKind::MessageEdited,
                EventPayload::Message(_)
            ) | (
                EventKind::ReactionAdded | EventKind::ReactionRemoved,
                EventPayload::Reaction(_)
            ) | (EventKind::ThreadMessage, EventPayload::ThreadMessage(_))
        )
    }

    /// Message body for moderation, from either a channel or a thread message.
    pub fn message(&self) -> Option<&MessagePayload> {
        match &self.payload {
            EventPayload::Message(message) => Some(message),
            EventPayload::ThreadMessage(thread) => Some(&thread.message),
            EventPayload::Reaction(_) => None,
        }
    }

    /// Reaction body, if this is a reaction event.
    pub fn reaction(&self) -> Option<&ReactionPayload> {
        match &self.payload {
            EventPayload::Reaction(reaction) => Some(reaction),
            _ => None,
        }
    }

    /// Thread body, if this is a thread message.
    pub fn thread(&self) -> Option<&ThreadMessagePayload> {
        match &self.payload {
            EventPayload::ThreadMessage(thread) => Some(thread),
            _ => None,
        }
    }
}
