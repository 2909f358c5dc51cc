//! In-memory stores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use warden_core::{
    BlocklistRule, MessageId, ModerationVerdict, StarboardEntry, ThreadId, ThreadState,
};
use warden_error::{StorageError, StorageErrorKind, StorageResult};
use warden_interface::{BlocklistSource, StarboardStore, ThreadStore, VerdictStore};

/// Serializable copy of everything an [`InMemoryStore`] holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Starboard entries
    #[serde(default)]
    pub starboard: Vec<StarboardEntry>,
    /// Help-thread states
    #[serde(default)]
    pub threads: Vec<ThreadState>,
    /// Latest verdicts
    #[serde(default)]
    pub verdicts: Vec<ModerationVerdict>,
}

/// Key-value store backed by maps, shareable across tasks by cloning.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    starboard: Arc<RwLock<HashMap<MessageId, StarboardEntry>>>,
    threads: Arc<RwLock<HashMap<ThreadId, ThreadState>>>,
    verdicts: Arc<RwLock<HashMap<MessageId, ModerationVerdict>>>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let starboard = snapshot
            .starboard
            .into_iter()
            .map(|entry| (entry.message_id, entry))
            .collect();
        let threads = snapshot
            .threads
            .into_iter()
            .map(|state| (state.thread_id, state))
            .collect();
        let verdicts = snapshot
            .verdicts
            .into_iter()
            .map(|verdict| (verdict.message_id, verdict))
            .collect();
        Self {
            starboard: Arc::new(RwLock::new(starboard)),
            threads: Arc::new(RwLock::new(threads)),
            verdicts: Arc::new(RwLock::new(verdicts)),
        }
    }

    /// Copy out everything currently stored.
    pub async fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            starboard: self.starboard.read().await.values().cloned().collect(),
            threads: self.threads.read().await.values().cloned().collect(),
            verdicts: self.verdicts.read().await.values().cloned().collect(),
        }
    }

    /// Load a store from a JSON snapshot file. A missing file yields an empty store.
    #[instrument]
    pub async fn load_json(path: &Path) -> StorageResult<Self> {
        debug!("Loading store snapshot");
        if !path.exists() {
            info!("No existing snapshot found, starting empty");
            return Ok(Self::new());
        }
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Io(e.to_string())))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)
            .map_err(|e| StorageError::new(StorageErrorKind::Malformed(e.to_string())))?;
        info!(
            starboard = snapshot.starboard.len(),
            threads = snapshot.threads.len(),
            verdicts = snapshot.verdicts.len(),
            "Store snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current contents to a JSON snapshot file.
    #[instrument(skip(self))]
    pub async fn save_json(&self, path: &Path) -> StorageResult<()> {
        let snapshot = self.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StorageError::new(StorageErrorKind::Malformed(e.to_string())))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Io(e.to_string())))?;
        info!("Store snapshot saved");
        Ok(())
    }
}

#[async_trait]
impl StarboardStore for InMemoryStore {
    async fn get_starboard_entry(&self, message: MessageId) -> StorageResult<Option<StarboardEntry>> {
        Ok(self.starboard.read().await.get(&message).cloned())
    }

    async fn put_starboard_entry(&self, entry: &StarboardEntry) -> StorageResult<()> {
        self.starboard
            .write()
            .await
            .insert(entry.message_id, entry.clone());
        Ok(())
    }
}

#[async_trait]
impl ThreadStore for InMemoryStore {
    async fn get_thread_state(&self, thread: ThreadId) -> StorageResult<Option<ThreadState>> {
        Ok(self.threads.read().await.get(&thread).cloned())
    }

    async fn put_thread_state(&self, state: &ThreadState) -> StorageResult<()> {
        self.threads
            .write()
            .await
            .insert(state.thread_id, state.clone());
        Ok(())
    }
}

#[async_trait]
impl VerdictStore for InMemoryStore {
    async fn get_verdict(&self, message: MessageId) -> StorageResult<Option<ModerationVerdict>> {
        Ok(self.verdicts.read().await.get(&message).cloned())
    }

    async fn put_verdict(&self, verdict: &ModerationVerdict) -> StorageResult<()> {
        self.verdicts
            .write()
            .await
            .insert(verdict.message_id, verdict.clone());
        Ok(())
    }
}

/// Blocklist source holding rules in memory; rules can be replaced at runtime.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlocklistSource {
    rules: Arc<parking_lot::RwLock<Vec<BlocklistRule>>>,
}

impl InMemoryBlocklistSource {
    /// Source serving `rules`.
    pub fn new(rules: Vec<BlocklistRule>) -> Self {
        Self {
            rules: Arc::new(parking_lot::RwLock::new(rules)),
        }
    }

    /// Replace the served rules.
    pub fn set_rules(&self, rules: Vec<BlocklistRule>) {
        *self.rules.write() = rules;
    }
}

#[async_trait]
impl BlocklistSource for InMemoryBlocklistSource {
    async fn load_blocklist_snapshot(&self) -> StorageResult<Vec<BlocklistRule>> {
        Ok(self.rules.read().clone())
    }
}
