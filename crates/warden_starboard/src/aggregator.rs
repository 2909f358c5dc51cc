//! Reaction aggregation and the showcase post lifecycle.

use crate::lock::KeyedLocks;
use crate::render::render_post;
use crate::StarboardConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use warden_core::{
    ChannelId, Event, EventKind, GuildId, MessageId, PostId, ReactionPayload, StarboardEntry,
    StarboardState,
};
use warden_error::{ConfigError, PlatformError, PlatformErrorKind, WardenResult};
use warden_interface::{PlatformAdapter, StarboardStore};
use warden_rate_limit::{RetryError, retry_with_backoff};

/// What a reaction did to the showcase post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostChange {
    /// No platform call was needed
    None,
    /// A post was created
    Created(PostId),
    /// The existing post was edited
    Edited(PostId),
    /// The post had vanished and was created again
    Recreated(PostId),
    /// The post was deleted
    Retracted,
    /// The platform call failed; the entry kept its previous state
    Failed(PlatformErrorKind),
}

/// Result of handling one reaction event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarboardOutcome {
    /// Not a star, a self-star, or a reaction in the showcase channel
    Ignored,
    /// Re-delivered add, or a remove from someone who was not counted
    Duplicate,
    /// The reactor set changed
    Updated {
        /// Distinct reactors after the event
        star_count: u32,
        /// Entry state after the event
        state: StarboardState,
        /// Effect on the showcase post
        post: PostChange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostPlan {
    Nothing,
    Create,
    Edit(PostId),
    Retract(PostId),
}

/// Decide the post operation for an entry whose count just changed.
fn plan(entry: &StarboardEntry, threshold: u32, retract_on_drop: bool) -> PostPlan {
    let reached = entry.star_count >= threshold;
    match (entry.state, entry.starboard_post_id) {
        (StarboardState::Posted, Some(post)) if reached || !retract_on_drop => {
            PostPlan::Edit(post)
        }
        (StarboardState::Posted, Some(post)) => PostPlan::Retract(post),
        (StarboardState::Posted, None) if reached => PostPlan::Create,
        (StarboardState::Posted, None) => PostPlan::Nothing,
        (StarboardState::BelowThreshold | StarboardState::Retracted, _) if reached => {
            PostPlan::Create
        }
        _ => PostPlan::Nothing,
    }
}

/// Keeps one showcase post per sufficiently starred message.
///
/// Mutations of one message's entry are serialized in arrival order; entries
/// of different messages update in parallel.
pub struct StarboardAggregator {
    config: StarboardConfig,
    platform: Arc<dyn PlatformAdapter>,
    store: Arc<dyn StarboardStore>,
    locks: KeyedLocks<MessageId>,
}

impl std::fmt::Debug for StarboardAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarboardAggregator")
            .field("config", &self.config)
            .field("platform", &self.platform.platform_name())
            .finish_non_exhaustive()
    }
}

impl StarboardAggregator {
    /// Build an aggregator.
    pub fn new(
        config: StarboardConfig,
        platform: Arc<dyn PlatformAdapter>,
        store: Arc<dyn StarboardStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            platform,
            store,
            locks: KeyedLocks::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &StarboardConfig {
        &self.config
    }

    /// Route a reaction event. Other events are ignored.
    pub async fn handle(&self, event: &Event) -> WardenResult<StarboardOutcome> {
        let Some(reaction) = event.reaction() else {
            return Ok(StarboardOutcome::Ignored);
        };
        match event.kind() {
            EventKind::ReactionAdded => {
                self.reaction_added(*event.guild_id(), *event.channel_id(), reaction)
                    .await
            }
            EventKind::ReactionRemoved => {
                self.reaction_removed(*event.guild_id(), *event.channel_id(), reaction)
                    .await
            }
            _ => Ok(StarboardOutcome::Ignored),
        }
    }

    /// Count a star.
    #[instrument(
        skip(self, reaction),
        fields(message_id = %reaction.message_id, reactor_id = %reaction.reactor_id)
    )]
    pub async fn reaction_added(
        &self,
        guild: GuildId,
        channel: ChannelId,
        reaction: &ReactionPayload,
    ) -> WardenResult<StarboardOutcome> {
        if !self.counts(channel, reaction) {
            return Ok(StarboardOutcome::Ignored);
        }
        if *self.config.ignore_self_stars() && reaction.message_author_id == Some(reaction.reactor_id)
        {
            debug!("Ignoring self-star");
            return Ok(StarboardOutcome::Ignored);
        }

        let _guard = self.locks.acquire(&reaction.message_id).await;
        let mut entry = match self.store.get_starboard_entry(reaction.message_id).await? {
            Some(entry) => entry,
            None => StarboardEntry::new(reaction.message_id, guild, channel),
        };
        entry.reconcile();
        if entry.author_id.is_none() {
            entry.author_id = reaction.message_author_id;
        }
        if reaction.excerpt.is_some() {
            entry.excerpt = reaction.excerpt.clone();
        }

        if !entry.add_reactor(reaction.reactor_id) {
            debug!("Reactor already counted");
            return Ok(StarboardOutcome::Duplicate);
        }
        self.apply(entry).await
    }

    /// Uncount a star.
    #[instrument(
        skip(self, reaction),
        fields(message_id = %reaction.message_id, reactor_id = %reaction.reactor_id)
    )]
    pub async fn reaction_removed(
        &self,
        _guild: GuildId,
        channel: ChannelId,
        reaction: &ReactionPayload,
    ) -> WardenResult<StarboardOutcome> {
        if !self.counts(channel, reaction) {
            return Ok(StarboardOutcome::Ignored);
        }

        let _guard = self.locks.acquire(&reaction.message_id).await;
        let Some(mut entry) = self.store.get_starboard_entry(reaction.message_id).await? else {
            debug!("Removal for a message with no entry");
            return Ok(StarboardOutcome::Duplicate);
        };
        entry.reconcile();

        if !entry.remove_reactor(reaction.reactor_id) {
            debug!("Reactor was not counted");
            return Ok(StarboardOutcome::Duplicate);
        }
        self.apply(entry).await
    }

    /// Current entry for a message.
    pub async fn entry(&self, message: MessageId) -> WardenResult<Option<StarboardEntry>> {
        Ok(self.store.get_starboard_entry(message).await?)
    }

    /// Release locks of messages with no pending events.
    pub async fn cleanup_locks(&self) {
        self.locks.cleanup_unused().await;
    }

    fn counts(&self, channel: ChannelId, reaction: &ReactionPayload) -> bool {
        if reaction.emoji != *self.config.emoji() {
            return false;
        }
        // Stars on showcase posts themselves are not counted
        *self.config.channel_id() != Some(channel)
    }

    /// Bring the showcase post in line with the entry, then persist it.
    async fn apply(&self, mut entry: StarboardEntry) -> WardenResult<StarboardOutcome> {
        let post = match self.config.channel_id() {
            Some(showcase) => self.sync_post(*showcase, &mut entry).await,
            None => PostChange::None,
        };
        self.store.put_starboard_entry(&entry).await?;
        debug!(star_count = entry.star_count, state = %entry.state, ?post, "Starboard entry updated");
        Ok(StarboardOutcome::Updated {
            star_count: entry.star_count,
            state: entry.state,
            post,
        })
    }

    async fn sync_post(&self, showcase: ChannelId, entry: &mut StarboardEntry) -> PostChange {
        let threshold = *self.config.threshold();
        match plan(entry, threshold, *self.config.retract_on_drop()) {
            PostPlan::Nothing => PostChange::None,
            PostPlan::Create => match self.create(showcase, entry).await {
                Ok(post) => {
                    info!(message_id = %entry.message_id, %post, "Showcase post created");
                    entry.starboard_post_id = Some(post);
                    entry.state = StarboardState::Posted;
                    PostChange::Created(post)
                }
                Err(kind) => {
                    warn!(message_id = %entry.message_id, error = %kind, "Showcase post failed, will retry on next star");
                    PostChange::Failed(kind)
                }
            },
            PostPlan::Edit(post) => match self.edit(post, entry).await {
                Ok(()) => PostChange::Edited(post),
                Err(PlatformErrorKind::NotFound(_)) => {
                    info!(message_id = %entry.message_id, %post, "Showcase post vanished, recreating");
                    entry.starboard_post_id = None;
                    if entry.star_count < threshold {
                        entry.state = StarboardState::Retracted;
                        return PostChange::Retracted;
                    }
                    match self.create(showcase, entry).await {
                        Ok(new_post) => {
                            entry.starboard_post_id = Some(new_post);
                            PostChange::Recreated(new_post)
                        }
                        Err(kind) => {
                            entry.state = StarboardState::Retracted;
                            warn!(message_id = %entry.message_id, error = %kind, "Showcase post recreation failed");
                            PostChange::Failed(kind)
                        }
                    }
                }
                Err(kind) => {
                    warn!(message_id = %entry.message_id, error = %kind, "Showcase post edit failed");
                    PostChange::Failed(kind)
                }
            },
            PostPlan::Retract(post) => match self.retract(post).await {
                Ok(()) => {
                    info!(message_id = %entry.message_id, %post, "Showcase post retracted");
                    entry.starboard_post_id = None;
                    entry.state = StarboardState::Retracted;
                    PostChange::Retracted
                }
                Err(kind) => {
                    warn!(message_id = %entry.message_id, error = %kind, "Showcase post retraction failed");
                    PostChange::Failed(kind)
                }
            },
        }
    }

    async fn create(
        &self,
        showcase: ChannelId,
        entry: &StarboardEntry,
    ) -> Result<PostId, PlatformErrorKind> {
        let content = self.render(entry);
        let content = content.as_str();
        let platform = self.platform.as_ref();
        self.call("create_post", move || platform.create_post(showcase, content))
            .await
    }

    async fn edit(&self, post: PostId, entry: &StarboardEntry) -> Result<(), PlatformErrorKind> {
        let content = self.render(entry);
        let content = content.as_str();
        let platform = self.platform.as_ref();
        self.call("edit_post", move || platform.edit_post(post, content))
            .await
    }

    /// Delete the post; one that is already gone counts as retracted.
    async fn retract(&self, post: PostId) -> Result<(), PlatformErrorKind> {
        let platform = self.platform.as_ref();
        match self
            .call("delete_post", move || platform.delete_post(post))
            .await
        {
            Err(PlatformErrorKind::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn call<T, F, Fut>(&self, op_name: &str, operation: F) -> Result<T, PlatformErrorKind>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, PlatformError>>,
    {
        match retry_with_backoff(self.config.retry(), op_name, || false, operation).await {
            Ok((value, _)) => Ok(value),
            Err(RetryError::Exhausted { last, .. }) => Err(last.kind),
            Err(RetryError::Permanent { error, .. }) => Err(error.kind),
            Err(RetryError::Aborted { .. }) => Err(PlatformErrorKind::Transient(
                "starboard call aborted".to_string(),
            )),
        }
    }

    fn render(&self, entry: &StarboardEntry) -> String {
        render_post(self.config.emoji(), entry, *self.config.excerpt_chars())
    }
}
