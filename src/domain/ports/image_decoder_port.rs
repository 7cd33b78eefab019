//! Port definition for turning raw bytes into a decoded image.

use crate::domain::errors::CacheResult;

/// Byte-to-image conversion primitive.
///
/// Called from the blocking pool; implementations may be CPU heavy.
pub trait ImageDecoderPort: Send + Sync {
    /// Decodes `bytes`, failing with
    /// [`CacheError::Decode`](crate::domain::errors::CacheError::Decode) if
    /// they are not a valid image.
    fn decode(&self, bytes: &[u8]) -> CacheResult<image::DynamicImage>;
}
