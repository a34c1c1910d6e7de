//! String-keyed caches for parsed ASTs and canonical bindings
//!
//! Backed by DashMap like the template token cache. The eviction policy is
//! explicit configuration: `Unbounded` never evicts, `Bounded` evicts the
//! oldest insertion once `capacity` entries are held.

use std::collections::VecDeque;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Cache eviction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Entries live as long as the owning parser
    #[default]
    Unbounded,
    /// First-in-first-out eviction above `capacity` entries
    Bounded { capacity: usize },
}

pub struct KeyedCache<V> {
    entries: DashMap<String, V>,
    strategy: CacheStrategy,
    /// Insertion order, only tracked for bounded caches
    order: Mutex<VecDeque<String>>,
}

impl<V: Clone> KeyedCache<V> {
    pub fn new(strategy: CacheStrategy) -> Self {
        Self {
            entries: DashMap::new(),
            strategy,
            order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Return the cached value for `key`, inserting `make()` if absent
    ///
    /// The first value stored for a key wins, so concurrent callers observe
    /// the same instance.
    pub fn get_or_insert_with(&self, key: &str, make: impl FnOnce() -> V) -> V {
        if let Some(existing) = self.get(key) {
            return existing;
        }

        let value = self
            .entries
            .entry(key.to_string())
            .or_insert_with(make)
            .value()
            .clone();

        if let CacheStrategy::Bounded { capacity } = self.strategy {
            self.track(key, capacity);
        }

        value
    }

    pub fn insert(&self, key: &str, value: V) {
        let fresh = self.entries.insert(key.to_string(), value).is_none();
        if let (true, CacheStrategy::Bounded { capacity }) = (fresh, self.strategy) {
            self.track(key, capacity);
        }
    }

    fn track(&self, key: &str, capacity: usize) {
        let mut order = self.order.lock();
        if order.iter().any(|k| k == key) {
            return;
        }
        order.push_back(key.to_string());

        while order.len() > capacity.max(1) {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.order.lock().clear();
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unbounded_keeps_everything() {
        let cache: KeyedCache<usize> = KeyedCache::new(CacheStrategy::Unbounded);
        for i in 0..100 {
            cache.insert(&format!("k{}", i), i);
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.get("k42"), Some(42));
    }

    #[test]
    fn get_or_insert_returns_first_value() {
        let cache: KeyedCache<Arc<str>> = KeyedCache::new(CacheStrategy::Unbounded);
        let a = cache.get_or_insert_with("foo", || Arc::from("first"));
        let b = cache.get_or_insert_with("foo", || Arc::from("second"));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*b, "first");
    }

    #[test]
    fn bounded_evicts_oldest() {
        let cache: KeyedCache<u32> = KeyedCache::new(CacheStrategy::Bounded { capacity: 2 });
        cache.get_or_insert_with("a", || 1);
        cache.get_or_insert_with("b", || 2);
        cache.get_or_insert_with("c", || 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn bounded_reinsert_does_not_double_track() {
        let cache: KeyedCache<u32> = KeyedCache::new(CacheStrategy::Bounded { capacity: 2 });
        cache.insert("a", 1);
        cache.insert("a", 10);
        cache.insert("b", 2);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
    }

    #[test]
    fn clear_empties_cache() {
        let cache: KeyedCache<u32> = KeyedCache::new(CacheStrategy::Bounded { capacity: 4 });
        cache.insert("a", 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn strategy_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            cache: CacheStrategy,
        }

        let w: Wrapper = toml::from_str("cache = { strategy = \"bounded\", capacity = 8 }").unwrap();
        assert_eq!(w.cache, CacheStrategy::Bounded { capacity: 8 });

        let w: Wrapper = toml::from_str("cache = { strategy = \"unbounded\" }").unwrap();
        assert_eq!(w.cache, CacheStrategy::Unbounded);
    }
}
