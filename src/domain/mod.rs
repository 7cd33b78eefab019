//! Domain layer with cache entities, errors and tier port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{CacheKey, ImageSource, KeyStrategy, LoadedImage, SharedImage};
pub use errors::{CacheError, CacheResult};
pub use ports::{DiskTierPort, ImageDecoderPort, MemoryTierPort, OriginPort};
