//! MutexKv - Named locks keyed by vendor object IDs
//!
//! Independent resource operations run concurrently, but some of them mutate
//! the same backend object (two extensions on one database, for example).
//! Handlers serialize those by locking the object's ID here before issuing
//! the mutating call and holding the guard until the follow-up wait is done.
//!
//! Entries are created on first use and removed once no task holds or waits
//! for them, so the table only grows with the number of keys in use.
//!
//! # Ordering
//!
//! Locking two different keys from one task can deadlock against another
//! task locking them in the opposite order. Callers that need several keys
//! must use [`MutexKv::lock_all`], which always acquires in ascending
//! lexical order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, trace};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters
    refs: usize,
}

#[derive(Debug, Default)]
struct Table {
    slots: Mutex<HashMap<String, Slot>>,
}

impl Table {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // The map is only mutated by short, non-panicking bookkeeping.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-wide registry of keyed locks
///
/// Cloning is cheap and every clone shares the same table.
#[derive(Debug, Clone, Default)]
pub struct MutexKv {
    table: Arc<Table>,
}

impl MutexKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds `key`, then hold it
    ///
    /// The lock is released when the returned guard is dropped. Dropping the
    /// future before it resolves gives up the place in line.
    pub async fn lock(&self, key: impl Into<String>) -> MutexKvGuard {
        let (lock, lease) = self.lease(key.into());
        trace!("waiting for lock on {}", lease.key);
        let guard = lock.lock_owned().await;
        trace!("locked {}", lease.key);
        MutexKvGuard {
            _guard: guard,
            lease,
        }
    }

    /// Hold `key` if it is free right now
    pub fn try_lock(&self, key: impl Into<String>) -> Option<MutexKvGuard> {
        let (lock, lease) = self.lease(key.into());
        let guard = lock.try_lock_owned().ok()?;
        trace!("locked {}", lease.key);
        Some(MutexKvGuard {
            _guard: guard,
            lease,
        })
    }

    /// Lock several keys in ascending lexical order
    ///
    /// Duplicate keys are locked once. Guards are returned in acquisition
    /// order; dropping the vector releases all of them.
    pub async fn lock_all<I, K>(&self, keys: I) -> Vec<MutexKvGuard>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Release a guard obtained from this table
    ///
    /// Same as dropping it, but panics if the guard belongs to a different
    /// table.
    pub fn unlock(&self, guard: MutexKvGuard) {
        assert!(
            Arc::ptr_eq(&self.table, &guard.lease.table),
            "unlock of {} through a table that did not lock it",
            guard.lease.key
        );
        drop(guard);
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.table.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lease(&self, key: String) -> (Arc<AsyncMutex<()>>, Lease) {
        let lock = {
            let mut slots = self.table.slots();
            let slot = slots.entry(key.clone()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                refs: 0,
            });
            slot.refs += 1;
            Arc::clone(&slot.lock)
        };

        let lease = Lease {
            table: Arc::clone(&self.table),
            key,
        };
        (lock, lease)
    }
}

/// One reference on a slot, returned on drop
#[derive(Debug)]
struct Lease {
    table: Arc<Table>,
    key: String,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut slots = self.table.slots();
        match slots.get_mut(&self.key) {
            Some(slot) if slot.refs > 1 => slot.refs -= 1,
            Some(_) => {
                slots.remove(&self.key);
                trace!("dropped lock entry for {}", self.key);
            }
            None => {
                error!("lock entry for {} vanished while referenced", self.key);
                debug_assert!(false, "lock entry for {} vanished", self.key);
            }
        }
    }
}

/// Scoped hold on one key of a [`MutexKv`]
#[must_use = "the key is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct MutexKvGuard {
    // Field order matters: the mutex is released before the lease can
    // remove the entry, so a fresh entry never coexists with a held one.
    _guard: OwnedMutexGuard<()>,
    lease: Lease,
}

impl MutexKvGuard {
    pub fn key(&self) -> &str {
        &self.lease.key
    }
}
