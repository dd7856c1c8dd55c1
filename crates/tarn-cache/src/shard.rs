//! Cache shards.

use crate::entry::CacheEntry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// One independent sub-cache.
///
/// The reader-writer lock protects the map; the entry counter mirrors the
/// map's length and is kept readable without the lock so `len()` and the
/// insert-path capacity check never contend with lookups. Outside a write
/// critical section the two always agree.
pub(crate) struct Shard {
    /// Key to entry mapping. Insertion order is not preserved.
    pub(crate) map: RwLock<HashMap<u32, CacheEntry>>,

    /// Entry count, readable without taking the lock.
    entries: AtomicU64,
}

impl Shard {
    /// Creates a shard with room for `capacity` entries.
    ///
    /// One extra slot is reserved so reaching the capacity bound does not
    /// land exactly on a load factor of 1 and trigger a rehash.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity(capacity + 1)),
            entries: AtomicU64::new(0),
        }
    }

    /// Returns the entry count without taking the lock.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.load(Ordering::Relaxed) as usize
    }

    /// Records one added entry. Call under the write lock.
    #[inline]
    pub(crate) fn note_added(&self) {
        self.entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Re-syncs the counter to the map's length. Call under the write lock
    /// after bulk removals.
    #[inline]
    pub(crate) fn sync_len(&self, len: usize) {
        self.entries.store(len as u64, Ordering::Relaxed);
    }
}
