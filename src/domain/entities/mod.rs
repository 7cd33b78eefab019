//! Domain entity definitions.

mod cache_key;
mod image;

pub use cache_key::{CacheKey, KeyStrategy};
pub use image::{ImageLoadedEvent, ImageSource, LoadedImage, RequestToken, SharedImage};
