//! Weak compiled-artifact cache (component J): caches plans/mapper
//! factories keyed by `keyenc::Key`, holding them weakly so cache
//! pressure never pins memory — a lost entry is cheap to rebuild because
//! `KeyEncoder`'s inputs are deterministic (spec.md §4.J).
//!
//! Grounded on the teacher's connection-pooling idiom (`connection.rs`)
//! as the closest analogue for "lock-striped interior-mutable map,
//! race-safe double-check build": a pool hands out a pooled resource
//! under a lock, checking first whether one is already idle before
//! creating a new one. This cache does the same check-then-build dance,
//! except what's pooled is a `Weak` handle to a compiled artifact rather
//! than a live connection, per spec.md §4.J.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Weak};

/// Default shard count: enough to keep lock contention low for a
/// moderate number of concurrently-compiling callers without the
/// bookkeeping overhead of one lock per key.
const DEFAULT_SHARDS: usize = 16;

/// Holds `V` artifacts weakly, keyed by `K`. Lock-striped across
/// `DEFAULT_SHARDS` (or a caller-chosen count) shards so lookups for
/// different keys rarely contend.
pub struct WeakCache<K, V> {
    shards: Vec<Mutex<HashMap<K, Weak<V>>>>,
}

impl<K: Eq + Hash, V> WeakCache<K, V> {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard_index(&self, key: &K) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Returns the cached artifact for `key` if one is still alive;
    /// otherwise builds a fresh one under the shard's lock (so two
    /// concurrent misses for the same key never both build) and caches
    /// it weakly.
    ///
    /// The lock is held across `build`, so a slow build serializes other
    /// callers hitting the *same shard* — acceptable per spec.md §4.J's
    /// "inputs are deterministic, a lost/rebuilt entry is cheap" framing;
    /// this crate doesn't attempt a narrower per-key lock.
    pub fn get_or_build(&self, key: K, build: impl FnOnce() -> V) -> Arc<V>
    where
        K: Clone,
    {
        let idx = self.shard_index(&key);
        let mut shard = self.shards[idx].lock().unwrap();
        if let Some(artifact) = shard.get(&key).and_then(Weak::upgrade) {
            return artifact;
        }
        log::debug!("code cache miss, rebuilding artifact");
        let artifact = Arc::new(build());
        shard.insert(key, Arc::downgrade(&artifact));
        artifact
    }

    /// Number of live, non-evicted entries across all shards (dead weak
    /// slots still occupying a map entry count too, until `sweep` or an
    /// overwriting `get_or_build` clears them).
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops entries whose artifact has already been reclaimed. Purely a
    /// housekeeping pass — correctness never depends on calling this, a
    /// dead entry just behaves like a cache miss on its next lookup and
    /// gets overwritten then.
    pub fn sweep(&self) {
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap();
            let before = shard.len();
            shard.retain(|_, w| w.strong_count() > 0);
            let evicted = before - shard.len();
            if evicted > 0 {
                log::debug!("code cache sweep evicted {evicted} dead entries");
            }
        }
    }
}

impl<K: Eq + Hash, V> Default for WeakCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_then_hits() {
        let cache: WeakCache<u32, String> = WeakCache::new();
        let mut builds = 0;
        let a = cache.get_or_build(1, || {
            builds += 1;
            "plan-a".to_string()
        });
        let b = cache.get_or_build(1, || {
            builds += 1;
            "plan-a-rebuilt".to_string()
        });
        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn rebuilds_after_artifact_is_dropped() {
        let cache: WeakCache<u32, String> = WeakCache::new();
        let a = cache.get_or_build(1, || "plan-a".to_string());
        drop(a);
        cache.sweep();
        assert_eq!(cache.len(), 0);
        let mut builds = 0;
        let b = cache.get_or_build(1, || {
            builds += 1;
            "plan-a-again".to_string()
        });
        assert_eq!(builds, 1);
        assert_eq!(*b, "plan-a-again");
    }

    #[test]
    fn distinct_keys_cache_independently() {
        let cache: WeakCache<u32, String> = WeakCache::new();
        let a = cache.get_or_build(1, || "one".to_string());
        let b = cache.get_or_build(2, || "two".to_string());
        assert_ne!(*a, *b);
        assert_eq!(cache.len(), 2);
    }
}
