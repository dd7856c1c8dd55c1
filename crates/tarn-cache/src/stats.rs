//! Packet cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Packet cache counters.
///
/// All counters are relaxed atomics so observers never take shard locks.
/// Readers see monotonic growth but no causal ordering between counters
/// and map state; exactness at a point in time is not required.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    insert_collisions: AtomicU64,
    lookup_collisions: AtomicU64,
    ttl_too_shorts: AtomicU64,
    deferred_inserts: AtomicU64,
    deferred_lookups: AtomicU64,
}

impl CacheStats {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert_collision(&self) {
        self.insert_collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lookup_collision(&self) {
        self.lookup_collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ttl_too_short(&self) {
        self.ttl_too_shorts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deferred_insert(&self) {
        self.deferred_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deferred_lookup(&self) {
        self.deferred_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing usable.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Inserts that found a live entry with different attributes under
    /// the same key.
    pub fn insert_collisions(&self) -> u64 {
        self.insert_collisions.load(Ordering::Relaxed)
    }

    /// Lookups that found an entry with different attributes under the
    /// same key.
    pub fn lookup_collisions(&self) -> u64 {
        self.lookup_collisions.load(Ordering::Relaxed)
    }

    /// Responses dropped because their minimum TTL fell below the floor.
    pub fn ttl_too_shorts(&self) -> u64 {
        self.ttl_too_shorts.load(Ordering::Relaxed)
    }

    /// Inserts abandoned to write-lock contention.
    pub fn deferred_inserts(&self) -> u64 {
        self.deferred_inserts.load(Ordering::Relaxed)
    }

    /// Lookups abandoned to read-lock contention.
    pub fn deferred_lookups(&self) -> u64 {
        self.deferred_lookups.load(Ordering::Relaxed)
    }

    /// Hit rate over all concluded lookups.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = CacheStats::default();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert_eq!(stats.hits(), 3);
        assert_eq!(stats.misses(), 1);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);

        stats.record_deferred_lookup();
        stats.record_ttl_too_short();
        assert_eq!(stats.deferred_lookups(), 1);
        assert_eq!(stats.ttl_too_shorts(), 1);
    }
}
