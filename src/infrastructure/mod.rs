//! Infrastructure layer with the concrete cache tiers.

/// Application configuration.
pub mod config;
/// Image handling (memory, disk and origin tiers, lookup pipeline).
pub mod image;

pub use config::{AppConfig, CacheConfig, CliArgs, Command, ConfigError, LogLevel, StorageManager};
pub use image::{
    CacheStats, DiskImageCache, DiskStats, HttpOrigin, ImageCrateDecoder, ImageLookup,
    LookupStats, MemoryImageCache, TieredImageCache, TieredImageCacheBuilder,
};
