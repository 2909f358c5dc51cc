//! Cross-channel repeated-content detection.

use crate::RepeatConfig;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;
use warden_core::{Action, ChannelId, MessageId, MessagePayload, UserId};

/// Users tracked before stale histories are swept.
const SWEEP_AFTER_USERS: usize = 4_096;

#[derive(Debug, Clone)]
struct Seen {
    at: Instant,
    channel: ChannelId,
    message: MessageId,
    signature: String,
}

/// A user posting the same content in several channels within the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatHit {
    /// Matching messages, the current one included
    pub count: usize,
    /// Channels the content appeared in
    pub channels: BTreeSet<ChannelId>,
    /// Earlier messages with the same content, oldest first
    pub earlier_messages: Vec<(ChannelId, MessageId)>,
}

/// Per-user sliding window of recent message signatures.
#[derive(Debug)]
pub struct RepeatTracker {
    config: RepeatConfig,
    history: Mutex<HashMap<UserId, VecDeque<Seen>>>,
}

impl RepeatTracker {
    /// Tracker using `config`.
    pub fn new(config: RepeatConfig) -> Self {
        Self {
            config,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Minimum action for a detected repeat.
    pub fn floor(&self) -> &Action {
        self.config.action()
    }

    /// Signature of a message: attachment names when present, otherwise the
    /// trimmed lowercase text. Empty messages have none.
    pub fn signature(message: &MessagePayload) -> Option<String> {
        if !message.attachments.is_empty() {
            return Some(format!("attach:{}", message.attachments.join(",")));
        }
        let content = message.content.trim().to_lowercase();
        (!content.is_empty()).then(|| format!("text:{content}"))
    }

    /// Record a new message and report whether it completes a repeat burst.
    pub fn observe(
        &self,
        author: UserId,
        channel: ChannelId,
        message: &MessagePayload,
    ) -> Option<RepeatHit> {
        self.observe_at(author, channel, message, Instant::now())
    }

    /// [`RepeatTracker::observe`] with an explicit clock reading.
    pub fn observe_at(
        &self,
        author: UserId,
        channel: ChannelId,
        message: &MessagePayload,
        now: Instant,
    ) -> Option<RepeatHit> {
        if !*self.config.enabled() {
            return None;
        }
        let signature = Self::signature(message)?;
        let window = Duration::from_secs(*self.config.window_secs());

        let mut history = self.history.lock();
        if history.len() > SWEEP_AFTER_USERS {
            history.retain(|_, seen| seen.back().is_some_and(|s| now.duration_since(s.at) <= window));
        }

        let seen = history.entry(author).or_default();
        while seen
            .front()
            .is_some_and(|oldest| now.duration_since(oldest.at) > window)
        {
            seen.pop_front();
        }

        let earlier: Vec<(ChannelId, MessageId)> = seen
            .iter()
            .filter(|s| s.signature == signature && s.message != message.message_id)
            .map(|s| (s.channel, s.message))
            .collect();

        seen.push_back(Seen {
            at: now,
            channel,
            message: message.message_id,
            signature,
        });
        while seen.len() > *self.config.history_per_user() {
            seen.pop_front();
        }

        let count = earlier.len() + 1;
        if count < *self.config.threshold() {
            return None;
        }
        let mut channels: BTreeSet<ChannelId> = earlier.iter().map(|(c, _)| *c).collect();
        channels.insert(channel);
        if channels.len() < 2 {
            return None;
        }

        debug!(author = %author, count, channels = channels.len(), "Repeated content across channels");
        Some(RepeatHit {
            count,
            channels,
            earlier_messages: earlier,
        })
    }
}
