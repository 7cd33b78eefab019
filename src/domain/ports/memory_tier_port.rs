//! Port definition for the in-memory tier.

use crate::domain::entities::{CacheKey, SharedImage};

/// Bounded key to decoded-image map.
///
/// Calls never suspend. Implementations must be safe for concurrent readers
/// and writers; `put` may silently evict another entry.
pub trait MemoryTierPort: Send + Sync {
    /// Returns the image for `key`, or `None` on a miss.
    fn get(&self, key: &CacheKey) -> Option<SharedImage>;

    /// Stores an image.
    fn put(&self, key: CacheKey, image: SharedImage);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all images from the cache.
    fn clear(&self);
}
