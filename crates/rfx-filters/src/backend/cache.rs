//! Keyed resource cache for compiled programs and uploaded textures.
//!
//! Entries are created lazily on first use and leave only through
//! [`ResourceCache::evict`] or [`ResourceCache::clear`]. There is no size
//! budget: the key space is bounded by the filter kinds and the static
//! blend sources a caller registers.

use std::collections::HashMap;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// String-keyed cache.
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: HashMap<String, T>,
    hits: u64,
    misses: u64,
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self { entries: HashMap::new(), hits: 0, misses: 0 }
    }

    /// Look up an entry, counting the hit or miss.
    pub fn get(&mut self, key: &str) -> Option<&T> {
        match self.entries.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Return the entry for `key`, creating it with `create` on a miss.
    ///
    /// A failed `create` leaves the cache unchanged.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        create: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        if self.entries.contains_key(key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let value = create()?;
            self.entries.insert(key.to_string(), value);
        }
        Ok(&self.entries[key])
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(key.into(), value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove one entry.
    pub fn evict(&mut self, key: &str) -> Option<T> {
        self.entries.remove(key)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { entries: self.entries.len(), hits: self.hits, misses: self.misses }
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_insert_counts() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let mut created = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with::<()>("Blur", || {
                    created += 1;
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*v, 7);
        }
        assert_eq!(created, 1);
        let stats = cache.stats();
        assert_eq!(stats, CacheStats { entries: 1, hits: 2, misses: 1 });
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_failed_create_leaves_cache_empty() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let err = cache.get_or_try_insert_with("Bad", || Err("no")).unwrap_err();
        assert_eq!(err, "no");
        assert!(!cache.contains("Bad"));
    }

    #[test]
    fn test_evict_and_clear() {
        let mut cache = ResourceCache::new();
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.evict("a"), Some(1));
        assert_eq!(cache.evict("a"), None);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
