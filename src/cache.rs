//! Bounded TTL cache for recommendation results
//!
//! Personalized recommendations are cached per (user_id, top_n) for a fixed
//! window. The cache is deliberately not invalidated on model rebuild: a
//! stale entry can outlive one rebuild, bounded by the TTL.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Concurrent cache with per-entry expiry and a hard entry bound
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// `max_entries == 0` disables caching entirely
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Fetch a live entry; expired entries are dropped on the way out
    pub fn get(&self, key: &K) -> Option<V> {
        let hit = {
            let entry = self.entries.get(key)?;
            if entry.expires_at > Instant::now() {
                Some(entry.value.clone())
            } else {
                None
            }
        };
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    pub fn insert(&self, key: K, value: V) {
        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.purge_expired();
            if self.entries.len() >= self.max_entries {
                // Still full of live entries: evict one arbitrary entry so
                // fresh results can land. Entries are equally cheap to
                // recompute, so eviction order does not matter.
                let victim = self.entries.iter().next().map(|e| e.key().clone());
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
