//! Per-handler LRU result cache (spec §4.10.1 step 1, §9 "Per-handler LRU
//! cache"). Each request handler owns its own instance — capacity 500,
//! invalidated by file prefix on edit. Never shared across handlers.

use lru::LruCache;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;

pub const DEFAULT_CAPACITY: usize = 500;

/// Keys are invalidated in bulk by file path via a small per-file reverse
/// index, avoiding a linear scan over the whole cache on every edit.
pub struct HandlerCache<K, V> {
    entries: LruCache<K, V>,
    keys_by_file: HashMap<String, Vec<K>>,
}

impl<K, V> HandlerCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity must be non-zero");
        Self {
            entries: LruCache::new(cap),
            keys_by_file: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn put(&mut self, file: &str, key: K, value: V) {
        self.keys_by_file
            .entry(file.to_string())
            .or_default()
            .push(key.clone());
        self.entries.put(key, value);
    }

    /// Drop every cached entry keyed to `file` (called on `didChange`).
    pub fn invalidate_file(&mut self, file: &str) {
        if let Some(keys) = self.keys_by_file.remove(file) {
            for key in keys {
                self.entries.pop(&key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys_by_file.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for HandlerCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let mut cache: HandlerCache<(String, u32, u32), u32> = HandlerCache::new(4);
        cache.put("a.ts", ("a.ts".into(), 1, 2), 42);
        assert_eq!(cache.get(&("a.ts".into(), 1, 2)), Some(&42));
    }

    #[test]
    fn invalidate_file_drops_only_that_files_keys() {
        let mut cache: HandlerCache<(String, u32, u32), u32> = HandlerCache::new(16);
        cache.put("a.ts", ("a.ts".into(), 1, 2), 1);
        cache.put("b.ts", ("b.ts".into(), 3, 4), 2);
        cache.invalidate_file("a.ts");
        assert!(cache.get(&("a.ts".into(), 1, 2)).is_none());
        assert_eq!(cache.get(&("b.ts".into(), 3, 4)), Some(&2));
    }

    #[test]
    fn evicts_least_recently_used_past_capacity() {
        let mut cache: HandlerCache<u32, u32> = HandlerCache::new(2);
        cache.put("a.ts", 1, 1);
        cache.put("a.ts", 2, 2);
        cache.put("a.ts", 3, 3);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&2), Some(&2));
        assert_eq!(cache.get(&3), Some(&3));
    }
}
