//! Platform adapter trait.

use async_trait::async_trait;
use std::time::Duration;
use warden_core::{ChannelId, GuildId, MessageId, PostId, UserId};
use warden_error::PlatformResult;

/// Outbound operations against the chat platform.
///
/// Implementations translate platform responses into [`warden_error::PlatformErrorKind`]:
/// 5xx and timeouts are `Transient`, HTTP 429 is `RateLimited`, missing
/// permissions are `PermissionDenied`, unknown targets are `NotFound` and a
/// message deleted before we got to it is `AlreadyDeleted`.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Delete a message.
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    /// Time a member out for `duration`.
    async fn timeout_member(
        &self,
        guild: GuildId,
        user: UserId,
        duration: Duration,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Ban a member.
    async fn ban_member(&self, guild: GuildId, user: UserId, reason: &str) -> PlatformResult<()>;

    /// Post a message authored by the bot.
    async fn create_post(&self, channel: ChannelId, content: &str) -> PlatformResult<PostId>;

    /// Replace the content of a bot post.
    async fn edit_post(&self, post: PostId, content: &str) -> PlatformResult<()>;

    /// Delete a bot post.
    async fn delete_post(&self, post: PostId) -> PlatformResult<()>;

    /// Platform name, for logs.
    fn platform_name(&self) -> &str;
}
