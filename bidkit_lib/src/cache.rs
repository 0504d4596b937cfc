//! In-memory bid cache guarded by a single lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::ad_unit::CacheKey;
use crate::slot::CachedBid;

/// Result of [`BidCache::claim`].
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// Nothing cached for the key.
    Miss,
    /// An unexpired silence answer is cached; it is left in place.
    Silenced,
    /// The entry was removed and handed to the caller. It may be expired.
    Claimed(CachedBid),
}

/// Thread-safe store of at most one bid per cache key.
///
/// Every operation runs under one structure-wide mutex, so operations are
/// serialized: a `peek` issued after an `upsert` returned sees its value.
/// There is no eviction; entries leave only when claimed, replaced or removed.
pub struct BidCache {
    entries: Mutex<HashMap<CacheKey, CachedBid>>,
    immediate_bid_ttl: Duration,
}

impl BidCache {
    /// Creates an empty cache. `immediate_bid_ttl` is the window written onto
    /// immediate bids when they are stored.
    pub fn new(immediate_bid_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            immediate_bid_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CachedBid>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies the cache-entry rewrite to a slot about to be stored or evaluated.
    pub fn normalize(&self, slot: CachedBid) -> CachedBid {
        slot.with_default_ttl(self.immediate_bid_ttl)
    }

    /// Returns a copy of the entry for `key`, if any.
    pub fn peek(&self, key: &CacheKey) -> Option<CachedBid> {
        self.lock().get(key).cloned()
    }

    /// Stores every valid slot under its key, replacing what was there.
    /// Invalid slots are skipped. Returns the number stored.
    pub fn upsert(&self, slots: Vec<CachedBid>) -> usize {
        let mut entries = self.lock();
        let mut stored = 0;
        for slot in slots {
            if !slot.is_valid() {
                tracing::debug!(key = %slot.key, cpm = ?slot.cpm, ttl = slot.ttl_secs, "skipping invalid slot");
                continue;
            }
            let slot = self.normalize(slot);
            entries.insert(slot.key.clone(), slot);
            stored += 1;
        }
        stored
    }

    /// Removes and returns the entry for `key`.
    pub fn remove(&self, key: &CacheKey) -> Option<CachedBid> {
        self.lock().remove(key)
    }

    /// Looks up `key` and, unless it holds an unexpired silence, removes it,
    /// all in one critical section. Two concurrent claims on the same key can
    /// never both receive the entry.
    pub fn claim(&self, key: &CacheKey, now_ms: i64) -> Claim {
        let mut entries = self.lock();
        match entries.get(key) {
            None => Claim::Miss,
            Some(slot) if slot.is_silence() && !slot.is_expired(now_ms) => Claim::Silenced,
            Some(_) => match entries.remove(key) {
                Some(slot) => Claim::Claimed(slot),
                None => Claim::Miss,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
