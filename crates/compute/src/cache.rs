//! Time-bounded memoization of computation results.
//!
//! Keys encode the operation name and the argument values in call
//! order, so `pow(2,3)` and `pow(3,2)` never collide. Entries expire
//! lazily: an expired entry is treated as absent on the next read and
//! overwritten by the recomputation. There is no background sweep.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Shared, concurrency-safe memoization layer over computation calls.
pub struct ComputeCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ComputeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Deterministic key for an operation and its ordered arguments.
    pub fn key<S: AsRef<str>>(operation: &str, args: &[S]) -> String {
        let mut key = String::from(operation);
        for arg in args {
            key.push(':');
            key.push_str(arg.as_ref());
        }
        key
    }

    /// Return the cached value, or invoke `f` and cache its result.
    ///
    /// The second element is true on a cache hit. The computation runs
    /// while holding the key's shard lock, so concurrent misses on the
    /// same key resolve to a single invocation of `f`; callers never
    /// observe a torn or stale entry.
    pub fn get_or_compute<F>(&self, key: String, f: F) -> (serde_json::Value, bool)
    where
        F: FnOnce() -> serde_json::Value,
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    return (occupied.get().value.clone(), true);
                }
                let value = f();
                occupied.insert(CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                });
                (value, false)
            }
            Entry::Vacant(vacant) => {
                let value = f();
                vacant.insert(CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                });
                (value, false)
            }
        }
    }

    /// Look up a live entry without computing.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live() {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        // The read guard is released; lazily evict the expired entry.
        self.entries.remove_if(key, |_, entry| !entry.is_live());
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
