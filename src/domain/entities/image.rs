//! Domain types for resolved images.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::CacheKey;

/// Decoded image handle shared between the memory tier and callers.
pub type SharedImage = Arc<image::DynamicImage>;

/// Which tier resolved a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Served from the in-memory LRU.
    MemoryCache,
    /// Read from the disk tier and decoded.
    DiskCache,
    /// Fetched from the origin.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A successfully resolved lookup.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Key the image is stored under.
    pub key: CacheKey,
    /// The decoded image.
    pub image: SharedImage,
    /// Tier that produced it.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Identity of one lookup request, captured by the caller at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl RequestToken {
    /// Allocates a process-unique token.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Message delivered to a caller's event loop when a lookup finishes.
#[derive(Debug, Clone)]
pub struct ImageLoadedEvent {
    /// Token the caller supplied with the request.
    pub token: RequestToken,
    /// Address that was looked up.
    pub url: String,
    /// Key derived from the address.
    pub key: CacheKey,
    /// The resolved image, or `None` if every tier failed.
    pub result: Option<LoadedImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = RequestToken::next();
        let b = RequestToken::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ImageSource::MemoryCache.to_string(), "memory");
        assert_eq!(ImageSource::DiskCache.to_string(), "disk");
        assert_eq!(ImageSource::Network.to_string(), "network");
    }
}
