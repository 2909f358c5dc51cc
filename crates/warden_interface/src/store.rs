//! Persistence contracts.
//!
//! The engine only needs keyed get/put for the entities each component owns,
//! plus a way to pull the current blocklist rule set.

use async_trait::async_trait;
use warden_core::{
    BlocklistRule, MessageId, ModerationVerdict, StarboardEntry, ThreadId, ThreadState,
};
use warden_error::StorageResult;

/// Source of the versioned blocklist rule set.
#[async_trait]
pub trait BlocklistSource: Send + Sync {
    /// Load every rule of the current rule set.
    async fn load_blocklist_snapshot(&self) -> StorageResult<Vec<BlocklistRule>>;
}

/// Starboard entries keyed by source message.
#[async_trait]
pub trait StarboardStore: Send + Sync {
    /// Fetch an entry.
    async fn get_starboard_entry(&self, message: MessageId) -> StorageResult<Option<StarboardEntry>>;

    /// Insert or replace an entry.
    async fn put_starboard_entry(&self, entry: &StarboardEntry) -> StorageResult<()>;
}

/// Help-thread state keyed by thread.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Fetch a thread's state.
    async fn get_thread_state(&self, thread: ThreadId) -> StorageResult<Option<ThreadState>>;

    /// Insert or replace a thread's state.
    async fn put_thread_state(&self, state: &ThreadState) -> StorageResult<()>;
}

/// Latest verdict keyed by message.
#[async_trait]
pub trait VerdictStore: Send + Sync {
    /// Fetch the latest verdict for a message.
    async fn get_verdict(&self, message: MessageId) -> StorageResult<Option<ModerationVerdict>>;

    /// Insert or replace the verdict for a message.
    async fn put_verdict(&self, verdict: &ModerationVerdict) -> StorageResult<()>;
}
