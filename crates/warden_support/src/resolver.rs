//! Help thread resolution.

use crate::machine::{ThreadInput, transition};
use crate::SupportConfig;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use warden_core::{
    ChannelId, Event, GuildId, MessagePayload, SuggestionOutcome, ThreadContext, ThreadId,
    ThreadMarker, ThreadMessagePayload, ThreadState, ThreadStatus, UserId,
};
use warden_error::{ConfigError, WardenResult};
use warden_interface::{PlatformAdapter, ThreadStore};
use warden_moderation::ClassifierAdapter;

/// Result of handling one thread message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// Not a help thread, a bot message, or a closed thread
    Ignored,
    /// The thread state was recorded
    Updated {
        /// Status before the message; None for a newly observed thread
        from: Option<ThreadStatus>,
        /// Status after the message
        to: ThreadStatus,
    },
    /// A marker from someone who is neither the owner nor a moderator
    MarkerRejected {
        /// Status that remains in force
        status: ThreadStatus,
    },
}

/// Drives the help thread state machine.
///
/// Callers deliver the messages of one thread in order; the ingest pipeline
/// does so because a thread is its own lane.
pub struct ThreadResolver {
    config: SupportConfig,
    classifier: ClassifierAdapter,
    platform: Arc<dyn PlatformAdapter>,
    store: Arc<dyn ThreadStore>,
}

impl std::fmt::Debug for ThreadResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadResolver")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .field("platform", &self.platform.platform_name())
            .finish_non_exhaustive()
    }
}

impl ThreadResolver {
    /// Build a resolver.
    pub fn new(
        config: SupportConfig,
        classifier: ClassifierAdapter,
        platform: Arc<dyn PlatformAdapter>,
        store: Arc<dyn ThreadStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            classifier,
            platform,
            store,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SupportConfig {
        &self.config
    }

    /// Route a thread message event. Other events are ignored.
    pub async fn handle(&self, event: &Event) -> WardenResult<ThreadOutcome> {
        match event.thread() {
            Some(thread) => {
                self.on_thread_message(*event.guild_id(), *event.author_id(), thread)
                    .await
            }
            None => Ok(ThreadOutcome::Ignored),
        }
    }

    /// Apply one thread message.
    #[instrument(
        skip(self, payload),
        fields(thread_id = %payload.thread_id, message_id = %payload.message.message_id)
    )]
    pub async fn on_thread_message(
        &self,
        guild: GuildId,
        author: UserId,
        payload: &ThreadMessagePayload,
    ) -> WardenResult<ThreadOutcome> {
        if !self.config.is_help_channel(payload.parent_channel_id) {
            return Ok(ThreadOutcome::Ignored);
        }
        if payload.message.author_is_bot {
            return Ok(ThreadOutcome::Ignored);
        }

        let existing = self.store.get_thread_state(payload.thread_id).await?;
        let from = existing.as_ref().map(|state| state.status);
        let mut state = existing.unwrap_or_else(|| {
            info!(owner_id = %author, "Help thread observed");
            ThreadState::open(payload.thread_id, guild, payload.parent_channel_id, author)
        });
        if state.status.is_terminal() {
            debug!("Thread closed, message ignored");
            return Ok(ThreadOutcome::Ignored);
        }

        match payload.marker {
            Some(marker) => {
                if !self.may_resolve(&state, author, &payload.message) {
                    warn!(user_id = %author, %marker, "Marker from unauthorized user rejected");
                    if from.is_none() {
                        self.store.put_thread_state(&state).await?;
                    }
                    return Ok(ThreadOutcome::MarkerRejected {
                        status: state.status,
                    });
                }
                self.apply_marker(&mut state, author, marker).await;
            }
            None => {
                state.status = transition(state.status, ThreadInput::Message);
                if from.is_none() && *self.config.suggestions_enabled() {
                    self.suggest(&mut state, payload).await;
                }
            }
        }

        state.updated_at = Utc::now();
        self.store.put_thread_state(&state).await?;
        if from != Some(state.status) {
            info!(from = ?from, to = %state.status, "Thread status changed");
        }
        Ok(ThreadOutcome::Updated {
            from,
            to: state.status,
        })
    }

    /// Mark a thread closed (archived or deleted). Returns whether it changed.
    #[instrument(skip(self))]
    pub async fn close(&self, thread: ThreadId) -> WardenResult<bool> {
        let Some(mut state) = self.store.get_thread_state(thread).await? else {
            return Ok(false);
        };
        if state.status.is_terminal() {
            return Ok(false);
        }
        state.status = ThreadStatus::Closed;
        state.updated_at = Utc::now();
        self.store.put_thread_state(&state).await?;
        info!("Thread closed");
        Ok(true)
    }

    /// Current status of a thread.
    pub async fn status(&self, thread: ThreadId) -> WardenResult<Option<ThreadStatus>> {
        Ok(self
            .store
            .get_thread_state(thread)
            .await?
            .map(|state| state.status))
    }

    /// Full state of a thread.
    pub async fn state(&self, thread: ThreadId) -> WardenResult<Option<ThreadState>> {
        Ok(self.store.get_thread_state(thread).await?)
    }

    fn may_resolve(&self, state: &ThreadState, author: UserId, message: &MessagePayload) -> bool {
        author == state.owner_id
            || message
                .author_roles
                .iter()
                .any(|role| self.config.moderator_role_ids().contains(role))
    }

    async fn apply_marker(&self, state: &mut ThreadState, author: UserId, marker: ThreadMarker) {
        state.status = transition(state.status, ThreadInput::Marker(marker));
        match marker {
            ThreadMarker::Solved => state.solved_by = Some(author),
            ThreadMarker::Unsolved => {
                state.solved_by = None;
                if let Some(role) = self.config.support_role_id() {
                    let ping = format!(
                        "<@&{role}> <@{}> still needs help in this thread.",
                        state.owner_id
                    );
                    self.post(state.thread_id, &ping).await;
                }
            }
        }
    }

    async fn suggest(&self, state: &mut ThreadState, payload: &ThreadMessagePayload) {
        let context = ThreadContext {
            thread_id: payload.thread_id,
            title: payload.title.clone().unwrap_or_default(),
            body: payload.message.content.clone(),
        };
        match self.classifier.suggest_solution(&context).await {
            SuggestionOutcome::Suggested(suggestion) => {
                let content = format!("{}\n\n{}", self.config.suggestion_header(), suggestion.text);
                if self.post(state.thread_id, &content).await {
                    state.status = transition(state.status, ThreadInput::Suggested);
                    state.last_ai_suggestion_at = Some(Utc::now());
                }
            }
            SuggestionOutcome::Unavailable => {
                debug!("No suggestion available, thread stays open");
            }
        }
    }

    async fn post(&self, thread: ThreadId, content: &str) -> bool {
        match self
            .platform
            .create_post(ChannelId::from(thread), content)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(thread_id = %thread, error = %e, "Failed to post into thread");
                false
            }
        }
    }
}
