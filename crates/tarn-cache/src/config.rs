//! Packet cache configuration.

use serde::Deserialize;

/// Packet cache configuration.
///
/// TTL fields are in seconds and 32 bits wide, matching the wire TTL
/// width. `max_entries` is divided evenly across shards; each shard
/// refuses insertions beyond its share.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum entries across the whole cache.
    pub max_entries: usize,

    /// Maximum effective TTL (ceiling) for cached responses.
    pub max_ttl: u32,

    /// Minimum effective TTL (floor); shorter responses are not cached.
    pub min_ttl: u32,

    /// TTL for SERVFAIL/REFUSED responses. Zero disables negative caching.
    pub temp_failure_ttl: u32,

    /// Budget of post-expiry seconds charged against stale hits.
    pub stale_ttl: u32,

    /// Disables TTL aging on hits when set.
    pub dont_age: bool,

    /// Number of independent shards. Clamped to at least 1.
    pub shards: usize,

    /// When set, inserts use a non-blocking write-lock attempt and are
    /// dropped on contention instead of waiting.
    pub deferrable_insert_lock: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 200_000,
            max_ttl: 86_400,
            min_ttl: 0,
            temp_failure_ttl: 60,
            stale_ttl: 60,
            dont_age: false,
            shards: 1,
            deferrable_insert_lock: false,
        }
    }
}
