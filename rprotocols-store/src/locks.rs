// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key write serialization.
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash as StdHash;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per key.
///
/// Writers touching the same key queue up behind each other, writers on different keys run in
/// parallel. Locks are only held weakly in the map and disappear once no guard or waiter refers to
/// them anymore.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Arc<Mutex<HashMap<K, Weak<AsyncMutex<()>>>>>,
}

impl<K> KeyedLocks<K>
where
    K: Clone + Eq + StdHash + Debug,
{
    pub fn new() -> Self {
        Self {
            locks: Arc::default(),
        }
    }

    /// Waits until the lock for `key` is free and takes it.
    ///
    /// The lock is released when the returned guard gets dropped, also when the waiting future is
    /// cancelled.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let mutex = self.get_or_insert(key);
        mutex.lock_owned().await
    }

    /// Number of keys with a live lock.
    pub fn len(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_insert(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mutex) = locks.get(key).and_then(Weak::upgrade) {
            return mutex;
        }

        // Drop entries of keys nobody holds anymore before growing the map.
        locks.retain(|_, lock| lock.strong_count() > 0);

        let mutex = Arc::new(AsyncMutex::new(()));
        locks.insert(key.clone(), Arc::downgrade(&mutex));
        mutex
    }
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            locks: self.locks.clone(),
        }
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Clone + Eq + StdHash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::KeyedLocks;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::<String>::new();
        let guard = locks.lock(&"a".to_string()).await;

        // A different key is free.
        let other = locks.lock(&"b".to_string()).await;
        drop(other);

        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&"a".to_string()).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serializes_critical_sections() {
        let locks = KeyedLocks::<u8>::new();
        let inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let inside = inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&1).await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(1)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
