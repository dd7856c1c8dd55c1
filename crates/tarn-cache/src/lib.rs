//! # Tarn Packet Cache
//!
//! Sharded, bounded-capacity cache of complete DNS response packets, keyed
//! by the distinguishing features of the query. Given an incoming query the
//! cache hands back a ready-to-send response (transaction ID spliced in,
//! record TTLs aged in place) without a round trip to a backend.
//!
//! ## Architecture
//!
//! - **Shards**: a fixed number of independent sub-caches, each a hash map
//!   behind its own reader-writer lock, selected by `key mod shards`.
//! - **Keying**: a stable 32-bit Jenkins hash over the query's wire bytes
//!   (transaction ID excluded), folded qname and transport flag. Hash
//!   collisions are resolved by a full-attribute comparison on every hit.
//! - **Hot path**: lookups take a non-blocking read lock and give up as a
//!   soft miss on contention. A loaded cache never makes lookups wait
//!   behind evictions.
//! - **Eviction**: a rotating expired-entry purge and an indiscriminate
//!   capacity trim, plus targeted invalidation by name and type. There is
//!   no per-entry LRU; insert stays O(1) under a shard lock.

mod config;
mod entry;
mod key;
mod shard;
mod stats;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use key::{burtle, packet_key};
pub use stats::CacheStats;

use bytes::Bytes;
use shard::Shard;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tarn_proto::{ttl, Name, ResponseCode, Result, HEADER_SIZE, QTYPE_ANY};
use tracing::{debug, trace};

/// Current wall-clock time in unix seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The query-side inputs of a cache lookup.
#[derive(Debug, Clone, Copy)]
pub struct CacheQuery<'a> {
    /// Parsed query name, case preserved as the client sent it.
    pub qname: &'a Name,

    /// Query type.
    pub qtype: u16,

    /// Query class.
    pub qclass: u16,

    /// True when the query arrived over TCP.
    pub tcp: bool,

    /// The raw query packet.
    pub packet: &'a [u8],

    /// Bytes the qname occupies inside the packet.
    pub consumed: usize,

    /// The client's transaction ID, spliced into the response on a hit.
    pub id: u16,
}

/// Outcome of a cache lookup.
///
/// The computed key is reported on every outcome so that after a miss the
/// caller can insert the backend's response under the same key without
/// rehashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The response buffer holds a ready-to-send answer.
    Hit {
        /// Response length written into the caller's buffer.
        len: usize,
        /// True when the entry was expired but served within the
        /// caller's tolerance.
        stale: bool,
        /// The computed cache key.
        key: u32,
    },

    /// Nothing usable was found.
    Miss {
        /// The computed cache key.
        key: u32,
    },
}

impl Lookup {
    /// Returns the computed cache key.
    #[inline]
    pub fn key(&self) -> u32 {
        match *self {
            Self::Hit { key, .. } | Self::Miss { key } => key,
        }
    }

    /// Returns true on a hit.
    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Sharded DNS response packet cache.
pub struct PacketCache {
    config: CacheConfig,
    shards: Vec<Shard>,
    /// Per-shard entry bound: `max_entries / shards`.
    per_shard_limit: usize,
    /// Rotation point for the expired-entry purge; monotonic, taken
    /// modulo the shard count.
    purge_cursor: AtomicU64,
    stats: CacheStats,
}

impl PacketCache {
    /// Creates a cache from its configuration. A shard count of zero is
    /// clamped to one.
    pub fn new(mut config: CacheConfig) -> Self {
        config.shards = config.shards.max(1);
        let per_shard_limit = config.max_entries / config.shards;
        let shards = (0..config.shards)
            .map(|_| Shard::with_capacity(per_shard_limit))
            .collect();

        Self {
            config,
            shards,
            per_shard_limit,
            purge_cursor: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    #[inline]
    fn shard_for(&self, key: u32) -> &Shard {
        &self.shards[key as usize % self.shards.len()]
    }

    /// Stores a backend response under a precomputed key.
    ///
    /// Never fails loudly: malformed, uncacheable or capacity-refused
    /// responses are dropped silently, observable only through the
    /// counters. SERVFAIL and REFUSED responses are cached for the
    /// temp-failure TTL (the override wins when given); a zero
    /// temp-failure TTL disables negative caching entirely.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &self,
        key: u32,
        qname: &Name,
        qtype: u16,
        qclass: u16,
        payload: &[u8],
        tcp: bool,
        rcode: ResponseCode,
        temp_failure_ttl: Option<u32>,
    ) {
        self.insert_at(
            key,
            qname,
            qtype,
            qclass,
            payload,
            tcp,
            rcode,
            temp_failure_ttl,
            unix_now(),
        );
    }

    /// [`insert`](Self::insert) with an explicit timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_at(
        &self,
        key: u32,
        qname: &Name,
        qtype: u16,
        qclass: u16,
        payload: &[u8],
        tcp: bool,
        rcode: ResponseCode,
        temp_failure_ttl: Option<u32>,
        now: u64,
    ) {
        if payload.len() < HEADER_SIZE {
            return;
        }

        let effective_ttl = if rcode.is_temp_failure() {
            let ttl = temp_failure_ttl.unwrap_or(self.config.temp_failure_ttl);
            if ttl == 0 {
                // Negative caching is opt-in.
                return;
            }
            ttl
        } else {
            let Some(found) = ttl::min_ttl(payload) else {
                // No TTL found, or the packet could not be walked.
                return;
            };
            let clamped = found.min(self.config.max_ttl);
            if clamped < self.config.min_ttl {
                self.stats.record_ttl_too_short();
                return;
            }
            clamped
        };

        let shard = self.shard_for(key);
        if shard.len() >= self.per_shard_limit {
            return;
        }

        let validity = now + u64::from(effective_ttl);
        let entry = CacheEntry::new(
            qname,
            qtype,
            qclass,
            tcp,
            Bytes::copy_from_slice(payload),
            now,
            validity,
        );

        if self.config.deferrable_insert_lock {
            match shard.map.try_write() {
                Some(mut map) => self.insert_locked(shard, &mut map, key, entry, now),
                None => {
                    self.stats.record_deferred_insert();
                    trace!(key, "insert deferred on write-lock contention");
                }
            }
        } else {
            let mut map = shard.map.write();
            self.insert_locked(shard, &mut map, key, entry, now);
        }
    }

    fn insert_locked(
        &self,
        shard: &Shard,
        map: &mut HashMap<u32, CacheEntry>,
        key: u32,
        new: CacheEntry,
        now: u64,
    ) {
        // Re-check now that the lock is held to close the race with
        // concurrent inserts.
        if map.len() >= self.per_shard_limit {
            return;
        }

        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(new);
                shard.note_added();
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get();
                let was_expired = existing.validity() <= now;

                if !was_expired
                    && !existing.matches(new.qname(), new.qtype(), new.qclass(), new.tcp())
                {
                    self.stats.record_insert_collision();
                    return;
                }

                // Keep the existing entry when it outlives the new one.
                if new.validity() <= existing.validity() {
                    return;
                }

                slot.insert(new);
            }
        }
    }

    /// Looks up a query, writing a ready-to-send response into `response`
    /// on a hit.
    ///
    /// `allow_expired` is a tolerance in seconds past expiry within which
    /// an entry is still served, flagged stale. `skip_aging` leaves the
    /// cached TTLs untouched for this call.
    ///
    /// # Errors
    ///
    /// Only the keying range check fails (packet shorter than a header or
    /// than its declared qname); every operational condition such as
    /// contention, expiry, collision or an undersized buffer reads as a
    /// miss.
    pub fn lookup(
        &self,
        query: &CacheQuery<'_>,
        response: &mut [u8],
        allow_expired: u32,
        skip_aging: bool,
    ) -> Result<Lookup> {
        self.lookup_at(query, response, allow_expired, skip_aging, unix_now())
    }

    /// [`lookup`](Self::lookup) with an explicit timestamp.
    pub fn lookup_at(
        &self,
        query: &CacheQuery<'_>,
        response: &mut [u8],
        allow_expired: u32,
        skip_aging: bool,
        now: u64,
    ) -> Result<Lookup> {
        let key = packet_key(query.qname, query.consumed, query.packet, query.tcp)?;
        let shard = self.shard_for(key);

        let (len, stale, age) = {
            let Some(map) = shard.map.try_read() else {
                // Never block the hot path behind a writer.
                self.stats.record_deferred_lookup();
                return Ok(Lookup::Miss { key });
            };

            let Some(entry) = map.get(&key) else {
                self.stats.record_miss();
                return Ok(Lookup::Miss { key });
            };

            let mut stale = false;
            if entry.is_expired(now) {
                if now - entry.validity() >= u64::from(allow_expired) {
                    self.stats.record_miss();
                    return Ok(Lookup::Miss { key });
                }
                stale = true;
            }

            let payload = entry.payload();
            if response.len() < payload.len() || payload.len() < HEADER_SIZE {
                return Ok(Lookup::Miss { key });
            }

            if !entry.matches(query.qname, query.qtype, query.qclass, query.tcp) {
                self.stats.record_lookup_collision();
                return Ok(Lookup::Miss { key });
            }

            // Splice the caller's transaction ID; keep the cached flags
            // and section counts.
            response[..2].copy_from_slice(&query.id.to_be_bytes());
            response[2..HEADER_SIZE].copy_from_slice(&payload[2..HEADER_SIZE]);

            if payload.len() == HEADER_SIZE {
                // Header-only response (e.g. FORMERR with no question).
                self.stats.record_hit();
                return Ok(Lookup::Hit {
                    len: HEADER_SIZE,
                    stale,
                    key,
                });
            }

            // Restore the question qname with the client's own casing.
            let qname_wire = query.qname.as_wire();
            let question_end = HEADER_SIZE + qname_wire.len();
            if payload.len() < question_end {
                return Ok(Lookup::Miss { key });
            }
            response[HEADER_SIZE..question_end].copy_from_slice(qname_wire);
            if payload.len() > question_end {
                response[question_end..payload.len()]
                    .copy_from_slice(&payload[question_end..]);
            }

            let age = if stale {
                // Serving the remainder budget past expiry.
                (entry.validity() - entry.added()).saturating_sub(u64::from(self.config.stale_ttl))
            } else {
                now - entry.added()
            };

            (payload.len(), stale, age)
        };

        // The shard lock is released; aging mutates only the caller's
        // buffer.
        if !self.config.dont_age && !skip_aging {
            let age = age.min(u64::from(u32::MAX)) as u32;
            let _ = ttl::age_ttls(&mut response[..len], age);
        }

        self.stats.record_hit();
        Ok(Lookup::Hit { len, stale, key })
    }

    /// Removes expired entries until at most `up_to` entries remain.
    ///
    /// Starts at the rotation cursor and sweeps shard by shard under their
    /// write locks, so repeated calls cover all shards fairly. Entries that
    /// have not expired are never touched, so the target may be missed.
    pub fn purge_expired(&self, up_to: usize) {
        self.purge_expired_at(up_to, unix_now());
    }

    /// [`purge_expired`](Self::purge_expired) with an explicit timestamp.
    pub fn purge_expired_at(&self, up_to: usize, now: u64) {
        let size = self.len();
        if up_to >= size {
            return;
        }

        let mut to_remove = size - up_to;
        let shard_count = self.shards.len();
        let mut scanned = 0;

        while to_remove > 0 && scanned < shard_count {
            let index = (self.purge_cursor.fetch_add(1, Ordering::Relaxed)
                % shard_count as u64) as usize;
            let shard = &self.shards[index];
            let mut map = shard.map.write();

            map.retain(|_, entry| {
                if to_remove > 0 && entry.is_expired(now) {
                    to_remove -= 1;
                    false
                } else {
                    true
                }
            });
            shard.sync_len(map.len());

            scanned += 1;
        }

        debug!(
            remaining = self.len(),
            scanned, "purged expired cache entries"
        );
    }

    /// Removes entries regardless of freshness until at most `up_to`
    /// remain.
    ///
    /// The deletion budget is spread across shards in index order; a shard
    /// holding less than its share is emptied and the shortfall rolls
    /// forward. Intended for memory pressure; fairness across entries is
    /// not guaranteed.
    pub fn expunge(&self, up_to: usize) {
        let size = self.len();
        if up_to >= size {
            return;
        }

        let to_remove = size - up_to;
        let mut removed = 0usize;
        let shard_count = self.shards.len();

        for (index, shard) in self.shards.iter().enumerate() {
            let mut map = shard.map.write();
            let share = (to_remove - removed) / (shard_count - index);

            if map.len() >= share {
                let doomed: Vec<u32> = map.keys().copied().take(share).collect();
                for key in &doomed {
                    map.remove(key);
                }
                removed += share;
            } else {
                removed += map.len();
                map.clear();
            }
            shard.sync_len(map.len());
        }

        debug!(removed, remaining = self.len(), "expunged cache entries");
    }

    /// Removes all entries for `name` (and its subdomains when
    /// `suffix_match` is set) whose qtype equals `qtype`, with
    /// [`QTYPE_ANY`] matching every type.
    pub fn expunge_by_name(&self, name: &Name, qtype: u16, suffix_match: bool) {
        let mut removed = 0usize;

        for shard in &self.shards {
            let mut map = shard.map.write();
            let before = map.len();
            map.retain(|_, entry| {
                let name_matches = entry.qname() == name
                    || (suffix_match && entry.qname().is_part_of(name));
                let type_matches = qtype == QTYPE_ANY || qtype == entry.qtype();
                !(name_matches && type_matches)
            });
            removed += before - map.len();
            shard.sync_len(map.len());
        }

        debug!(%name, qtype, suffix_match, removed, "expunged cache entries by name");
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the cache has reached its configured capacity.
    pub fn is_full(&self) -> bool {
        self.len() >= self.config.max_entries
    }

    /// Returns the configured capacity.
    pub fn max_entries(&self) -> usize {
        self.config.max_entries
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the cache counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl fmt::Display for PacketCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.len(), self.config.max_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tarn_proto::QCLASS_IN;

    #[test]
    fn test_zero_shards_clamped() {
        let cache = PacketCache::new(CacheConfig {
            shards: 0,
            ..CacheConfig::default()
        });
        assert_eq!(cache.shard_count(), 1);
    }

    #[test]
    fn test_display() {
        let cache = PacketCache::new(CacheConfig {
            max_entries: 100,
            ..CacheConfig::default()
        });
        assert_eq!(cache.to_string(), "0/100");
    }

    #[test]
    fn test_empty_and_full() {
        let cache = PacketCache::new(CacheConfig {
            max_entries: 1,
            ..CacheConfig::default()
        });
        assert!(cache.is_empty());
        assert!(!cache.is_full());

        let qname = Name::from_str("www.example.com").unwrap();
        let payload = [0u8; HEADER_SIZE];
        cache.insert_at(
            7,
            &qname,
            1,
            QCLASS_IN,
            &payload,
            false,
            ResponseCode::ServFail,
            Some(30),
            1_000,
        );
        assert_eq!(cache.len(), 1);
        assert!(cache.is_full());
    }
}
