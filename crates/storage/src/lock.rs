//! Per-key exclusive locks created on demand.
//!
//! A registry maps each contended key to a lock and the number of holders
//! and waiters referencing it. Entries are created on the first acquire
//! and removed as soon as the last reference goes away, so memory tracks
//! the keys currently in use rather than every key ever seen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus queued acquirers. Never zero while the entry exists.
    waiters: usize,
}

type Registry = Arc<Mutex<HashMap<String, LockEntry>>>;

/// Hands out exclusive access per string key.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct KeyedLockManager {
    registry: Registry,
}

impl KeyedLockManager {
    /// Create an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// The returned guard releases on drop. Dropping the returned future
    /// before it resolves also gives up the reservation, so a cancelled
    /// acquire never leaves an entry behind.
    pub async fn acquire(&self, key: &str) -> KeyedLockGuard {
        let (lock, registration) = {
            let mut registry = lock_registry(&self.registry);
            let entry = registry
                .entry(key.to_string())
                .or_insert_with(|| LockEntry {
                    lock: Arc::new(AsyncMutex::new(())),
                    waiters: 0,
                });
            entry.waiters += 1;
            (
                entry.lock.clone(),
                Registration {
                    registry: self.registry.clone(),
                    key: key.to_string(),
                },
            )
        };

        // Wait outside the registry mutex so other keys are unaffected.
        let held = lock.lock_owned().await;
        tracing::trace!(key = %key, "keyed lock acquired");

        KeyedLockGuard {
            _held: held,
            registration,
        }
    }

    /// Number of keys with a live entry.
    pub fn active_keys(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    /// Whether `key` currently has a live entry.
    pub fn contains(&self, key: &str) -> bool {
        lock_registry(&self.registry).contains_key(key)
    }

    /// Holders plus waiters referencing `key` (zero if absent).
    #[cfg(test)]
    pub(crate) fn waiters(&self, key: &str) -> usize {
        lock_registry(&self.registry)
            .get(key)
            .map(|entry| entry.waiters)
            .unwrap_or(0)
    }
}

fn lock_registry(registry: &Registry) -> MutexGuard<'_, HashMap<String, LockEntry>> {
    // Bookkeeping is a few integer updates; a poisoned registry is still consistent.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One reference to a registry entry, dropped after the lock itself.
struct Registration {
    registry: Registry,
    key: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut registry = lock_registry(&self.registry);
        if let Some(entry) = registry.get_mut(&self.key) {
            entry.waiters -= 1;
            if entry.waiters == 0 {
                registry.remove(&self.key);
            }
        } else {
            tracing::error!(key = %self.key, "keyed lock entry missing on release");
        }
    }
}

/// Exclusive access to one key. Released on drop.
pub struct KeyedLockGuard {
    // Field order matters: the lock is released before the entry is unreferenced.
    _held: OwnedMutexGuard<()>,
    registration: Registration,
}

impl KeyedLockGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.registration.key
    }
}

impl std::fmt::Debug for KeyedLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLockGuard")
            .field("key", &self.registration.key)
            .finish()
    }
}
