//! Oxicache - a tiered image cache.
//!
//! Lookups go memory -> disk -> network. The memory tier answers
//! synchronously; disk and network work runs on a tokio runtime so callers are
//! never blocked, and every lookup is answered exactly once, with `None` when
//! no tier could produce an image.
//!
//! ```no_run
//! # async fn demo() -> Result<(), oxicache::domain::CacheError> {
//! use oxicache::infrastructure::{CacheConfig, TieredImageCache};
//!
//! let cache = TieredImageCache::from_config(&CacheConfig::default())?;
//! if let Some(loaded) = cache.lookup("https://example.com/photo.jpg").await {
//!     println!("{}x{} from {}", loaded.width(), loaded.height(), loaded.source);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing services for cache consumers.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the concrete cache tiers and configuration.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "oxicache";

/// User agent sent to the origin unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("oxicache/", env!("CARGO_PKG_VERSION"));
