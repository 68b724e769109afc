//! LRU cache implementation.

use crate::Weighted;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Instant;
use tracing::{debug, trace};
use vigil_core::RequestFingerprint;

/// Default size bound when no device recommendation is available (64 MiB).
const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

/// Configuration for [`ResultCache`].
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ResultCacheConfig {
    /// Upper bound on the summed size of cached values
    max_bytes: usize,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct CacheStats {
    /// Lookups that found an entry
    hits: u64,
    /// Lookups that found nothing
    misses: u64,
    /// Entries removed to respect the size bound
    evictions: u64,
    /// Current entry count
    entries: usize,
    /// Current summed size of entries
    total_bytes: usize,
    /// Current size bound
    max_bytes: usize,
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    size: usize,
    inserted_at: Instant,
    tick: u64,
}

#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// Access tick to key; the first entry is the least recently accessed.
    order: BTreeMap<u64, K>,
    next_tick: u64,
    total_bytes: usize,
    max_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash + Clone, V> CacheState<K, V> {
    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn remove(&mut self, key: &K) -> Option<Slot<V>> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        self.total_bytes -= slot.size;
        Some(slot)
    }

    fn evict_to(&mut self, bound: usize) {
        while self.total_bytes > bound {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&key) {
                self.total_bytes -= slot.size;
                self.evictions += 1;
                trace!(
                    size = slot.size,
                    age_ms = slot.inserted_at.elapsed().as_millis() as u64,
                    "Evicted cache entry"
                );
            }
        }
    }
}

/// Thread-safe, size-bounded LRU cache.
///
/// Every `get` hit refreshes recency. When a `put` pushes the summed size over
/// the bound, least-recently-accessed entries are evicted until it fits again.
/// Access ticks are unique, so entries never tie on recency.
#[derive(Debug)]
pub struct ResultCache<K = RequestFingerprint, V = std::sync::Arc<vigil_core::GeneratedOutput>> {
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Weighted + Clone,
{
    /// Create an empty cache.
    pub fn new(config: ResultCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_tick: 0,
                total_bytes: 0,
                max_bytes: config.max_bytes,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Look up a value, refreshing its recency on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let tick = state.tick();
        let Some(slot) = state.entries.get_mut(key) else {
            state.misses += 1;
            return None;
        };
        let old_tick = std::mem::replace(&mut slot.tick, tick);
        let value = slot.value.clone();
        state.order.remove(&old_tick);
        state.order.insert(tick, key.clone());
        state.hits += 1;
        Some(value)
    }

    /// Insert or replace a value.
    ///
    /// A value larger than the whole bound is not stored; any previous value
    /// under the same key is dropped so a later `get` never returns stale data.
    pub fn put(&self, key: K, value: V) {
        let size = value.size_bytes();
        let mut state = self.state.lock();
        state.remove(&key);

        if size > state.max_bytes {
            debug!(size, max_bytes = state.max_bytes, "Value exceeds cache bound, not cached");
            return;
        }

        let bound = state.max_bytes - size;
        state.evict_to(bound);

        let tick = state.tick();
        state.order.insert(tick, key.clone());
        state.entries.insert(
            key,
            Slot {
                value,
                size,
                inserted_at: Instant::now(),
                tick,
            },
        );
        state.total_bytes += size;
        trace!(size, total_bytes = state.total_bytes, "Cached value");
    }

    /// Remove a single entry, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.state.lock().remove(key).map(|slot| slot.value)
    }

    /// Whether an entry exists, without touching recency or counters.
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.order.clear();
        state.total_bytes = 0;
        debug!(dropped, "Cache cleared");
    }

    /// Change the size bound, evicting down to it immediately.
    pub fn set_max_bytes(&self, max_bytes: usize) {
        let mut state = self.state.lock();
        state.max_bytes = max_bytes;
        state.evict_to(max_bytes);
        debug!(max_bytes, total_bytes = state.total_bytes, "Cache bound changed");
    }

    /// Current size bound.
    pub fn max_bytes(&self) -> usize {
        self.state.lock().max_bytes
    }

    /// Current summed size of entries.
    pub fn total_bytes(&self) -> usize {
        self.state.lock().total_bytes
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of hit, miss and eviction counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
            max_bytes: state.max_bytes,
        }
    }
}

impl<K, V> Default for ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Weighted + Clone,
{
    fn default() -> Self {
        Self::new(ResultCacheConfig::default())
    }
}
