//! Per-key mutual exclusion for read-modify-write against the store.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::users::Identity;

/// Key of a stored record that workers may update concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Article(i64),
    User(Identity),
}

/// One async mutex per key, created on first use and dropped with its last
/// guard.
///
/// Holding the guard returned by [`KeyedLocks::lock`] across a
/// find → merge → write sequence makes that sequence atomic with respect to
/// every other task locking the same key. Tasks on different keys never block
/// each other.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    // Only held for map lookups, never across an await.
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyGuard<'_, K> {
        let mutex = {
            let mut entries = self.entries();
            Arc::clone(entries.entry(key.clone()).or_default())
        };
        let guard = mutex.lock_owned().await;
        KeyGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Lock every key in `keys`, in sorted order so that tasks with
    /// overlapping key sets cannot deadlock.
    pub async fn lock_all(&self, keys: impl IntoIterator<Item = K>) -> Vec<KeyGuard<'_, K>>
    where
        K: Ord,
    {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of keys currently locked or awaited.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to one key; released on drop.
pub struct KeyGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    locks: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> Drop for KeyGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        drop(self.guard.take());

        // Clones are only taken under the map lock, so a count of one means
        // no other task holds or awaits this key.
        let mut entries = self.locks.entries();
        if entries
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            entries.remove(&self.key);
        }
    }
}
