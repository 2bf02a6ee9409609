//! Grouped entity cache
//!
//! Stores values under a `(scope, id)` pair using `DashMap` for concurrent access.

use chat_core::Snowflake;
use dashmap::DashMap;

/// Put/remove/get access to a scoped entity store
///
/// `scope` is the owning container of the entity (a guild for channels and
/// members, a channel for messages); top-level entities use their own ID as scope.
pub trait CacheStore<V>: Send + Sync {
    /// Insert or replace a value, returning the previous one
    fn put(&self, scope: Snowflake, id: Snowflake, value: V) -> Option<V>;

    /// Remove a value, returning it if it was cached
    fn remove(&self, scope: Snowflake, id: Snowflake) -> Option<V>;

    /// Get a copy of a cached value
    fn get(&self, scope: Snowflake, id: Snowflake) -> Option<V>;
}

/// Concurrent cache keyed by `(scope, id)`
pub struct GroupedCache<V> {
    entries: DashMap<(Snowflake, Snowflake), V>,
    enabled: bool,
}

impl<V: Clone> GroupedCache<V> {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            enabled: true,
        }
    }

    /// Create a cache that ignores all puts
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            entries: DashMap::new(),
            enabled: false,
        }
    }

    /// Whether puts are stored
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// All values in a scope, in no particular order
    pub fn scope_values(&self, scope: Snowflake) -> Vec<V> {
        self.entries
            .iter()
            .filter(|entry| entry.key().0 == scope)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Drop every value in a scope, returning how many were removed
    pub fn remove_scope(&self, scope: Snowflake) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(s, _), _| *s != scope);
        before.saturating_sub(self.entries.len())
    }

    /// Number of cached values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<V: Clone> Default for GroupedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for GroupedCache<V> {
    fn put(&self, scope: Snowflake, id: Snowflake, value: V) -> Option<V> {
        if !self.enabled {
            return None;
        }
        self.entries.insert((scope, id), value)
    }

    fn remove(&self, scope: Snowflake, id: Snowflake) -> Option<V> {
        self.entries.remove(&(scope, id)).map(|(_, v)| v)
    }

    fn get(&self, scope: Snowflake, id: Snowflake) -> Option<V> {
        self.entries.get(&(scope, id)).map(|r| r.value().clone())
    }
}

impl<V> std::fmt::Debug for GroupedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedCache")
            .field("entries", &self.entries.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sf(id: u64) -> Snowflake {
        Snowflake::new(id)
    }

    #[test]
    fn test_put_get_remove() {
        let cache: GroupedCache<String> = GroupedCache::new();
        assert!(cache.put(sf(1), sf(10), "a".to_string()).is_none());
        assert_eq!(cache.get(sf(1), sf(10)), Some("a".to_string()));

        let previous = cache.put(sf(1), sf(10), "b".to_string());
        assert_eq!(previous, Some("a".to_string()));

        assert_eq!(cache.remove(sf(1), sf(10)), Some("b".to_string()));
        assert!(cache.get(sf(1), sf(10)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_scope_isolation() {
        let cache: GroupedCache<u32> = GroupedCache::new();
        cache.put(sf(1), sf(10), 1);
        cache.put(sf(2), sf(10), 2);

        assert_eq!(cache.get(sf(1), sf(10)), Some(1));
        assert_eq!(cache.get(sf(2), sf(10)), Some(2));
        assert_eq!(cache.scope_values(sf(1)), vec![1]);
    }

    #[test]
    fn test_remove_scope() {
        let cache: GroupedCache<u32> = GroupedCache::new();
        cache.put(sf(1), sf(10), 1);
        cache.put(sf(1), sf(11), 2);
        cache.put(sf(2), sf(12), 3);

        assert_eq!(cache.remove_scope(sf(1)), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.scope_values(sf(1)).is_empty());
    }

    #[test]
    fn test_disabled_cache_ignores_puts() {
        let cache: GroupedCache<u32> = GroupedCache::disabled();
        assert!(!cache.is_enabled());
        cache.put(sf(1), sf(10), 1);
        assert!(cache.get(sf(1), sf(10)).is_none());
    }

    #[test]
    fn test_concurrent_puts() {
        let cache = std::sync::Arc::new(GroupedCache::<u64>::new());
        let handles: Vec<_> = (0..4_u64)
            .map(|scope| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for id in 0..100 {
                        cache.put(sf(scope), sf(id), id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
