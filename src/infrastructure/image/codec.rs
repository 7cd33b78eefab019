//! Image decoding backed by the `image` crate.

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::ImageDecoderPort;

/// Decodes any format enabled in the `image` crate features.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoderPort for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> CacheResult<image::DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| CacheError::decode(format!("Failed to decode image: {e}")))
    }
}

/// Encodes an image as PNG. Used to produce fixtures and by callers that
/// need to hand a decoded image back as bytes.
///
/// # Errors
/// Returns error if encoding fails.
pub fn encode_png(image: &image::DynamicImage) -> CacheResult<Vec<u8>> {
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| CacheError::decode(format!("Failed to encode image: {e}")))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png() {
        let bytes = encode_png(&image::DynamicImage::new_rgb8(7, 3)).unwrap();
        let decoded = ImageCrateDecoder.decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
    }

    #[test]
    fn test_decode_garbage() {
        let err = ImageCrateDecoder.decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));
    }
}
