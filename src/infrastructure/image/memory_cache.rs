//! In-memory LRU image cache implementation.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, SharedImage};
use crate::domain::ports::MemoryTierPort;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// In-memory LRU cache for decoded images.
///
/// Access is synchronous: a short critical section around the LRU list,
/// never held across an await point.
pub struct MemoryImageCache {
    cache: Mutex<LruCache<CacheKey, SharedImage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }

    /// Returns the configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len(),
        }
    }

    /// Peeks at an image without promoting it in the LRU.
    pub fn peek(&self, key: &CacheKey) -> Option<SharedImage> {
        self.cache.lock().peek(key).cloned()
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

impl MemoryTierPort for MemoryImageCache {
    fn get(&self, key: &CacheKey) -> Option<SharedImage> {
        let found = self.cache.lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
        }
        found
    }

    fn put(&self, key: CacheKey, image: SharedImage) {
        debug!(key = %key, "Storing image in memory cache");
        if let Some((evicted, _)) = self.cache.lock().push(key.clone(), image)
            && evicted != key
        {
            trace!(key = %evicted, "Evicted least recently used image");
        }
    }

    fn len(&self) -> usize {
        self.cache.lock().len()
    }

    fn clear(&self) {
        self.cache.lock().clear();
        debug!("Cleared memory image cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(width: u32) -> SharedImage {
        Arc::new(image::DynamicImage::new_rgb8(width, 10))
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("test1");

        cache.put(key.clone(), sample(100));
        let retrieved = cache.get(&key);

        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().width(), 100);
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryImageCache::new(10);
        assert!(cache.get(&CacheKey::new("nonexistent")).is_none());
    }

    #[test]
    fn test_cache_eviction() {
        let cache = MemoryImageCache::new(2);

        let key1 = CacheKey::new("test1");
        let key2 = CacheKey::new("test2");
        let key3 = CacheKey::new("test3");

        cache.put(key1.clone(), sample(10));
        cache.put(key2.clone(), sample(10));
        cache.put(key3.clone(), sample(10));

        // key1 should be evicted (LRU)
        assert!(cache.get(&key1).is_none());
        assert!(cache.get(&key2).is_some());
        assert!(cache.get(&key3).is_some());
    }

    #[test]
    fn test_put_replaces_existing() {
        let cache = MemoryImageCache::new(2);
        let key = CacheKey::new("test1");

        cache.put(key.clone(), sample(10));
        cache.put(key.clone(), sample(20));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().width(), 20);
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new(10);
        let key = CacheKey::new("test1");

        cache.put(key.clone(), sample(10));

        let _ = cache.get(&key);
        let _ = cache.get(&CacheKey::new("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = MemoryImageCache::new(2);

        let key1 = CacheKey::new("test1");
        let key2 = CacheKey::new("test2");

        cache.put(key1.clone(), sample(10));
        cache.put(key2.clone(), sample(10));

        // Peek at key1 (should not promote it)
        let _ = cache.peek(&key1);

        cache.put(CacheKey::new("test3"), sample(10));

        assert!(cache.peek(&key1).is_none());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = MemoryImageCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(MemoryImageCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = CacheKey::new(format!("k{}", (t * 7 + i) % 32));
                        cache.put(key.clone(), sample(1 + (i % 5)));
                        let _ = cache.get(&key);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
    }
}
