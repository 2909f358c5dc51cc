//! Per-key mutual exclusion.
//!
//! Waiters on one key are served in arrival order (tokio's mutex is fair), so
//! two events for the same message apply in the order they were received.
//! Different keys never contend beyond the brief registry lookup.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lock registry keyed by `K`.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Held while a key is locked.
#[derive(Debug)]
pub struct KeyedGuard {
    _guard: OwnedMutexGuard<()>,
}

impl<K> KeyedLocks<K>
where
    K: Hash + Eq + Clone,
{
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &K) -> KeyedGuard {
        let slot = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        KeyedGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Drop locks nobody holds or waits for.
    pub async fn cleanup_unused(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    /// Keys currently registered.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Whether no key is registered.
    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
