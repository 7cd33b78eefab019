//! Image caching infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU eviction
//! - Disk caching for persistence
//! - HTTP origin retrieval
//! - The tiered lookup pipeline with request coalescing

/// Byte-to-image decoding.
pub mod codec;
/// File-per-key persistent tier.
pub mod disk_cache;
/// HTTP origin tier.
pub mod http_origin;
/// Tier orchestration and the lookup future.
pub mod loader;
/// LRU memory tier.
pub mod memory_cache;
/// Per-key coalescing of in-flight lookups.
pub mod pending;

pub use codec::{ImageCrateDecoder, encode_png};
pub use disk_cache::{DiskImageCache, DiskStats};
pub use http_origin::HttpOrigin;
pub use loader::{ImageLookup, LookupStats, TieredImageCache, TieredImageCacheBuilder};
pub use memory_cache::{CacheStats, MemoryImageCache};
pub use pending::PendingLookups;
