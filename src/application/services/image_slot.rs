use tokio::sync::mpsc;
use tracing::trace;

use crate::domain::entities::{ImageLoadedEvent, LoadedImage, RequestToken};
use crate::infrastructure::image::TieredImageCache;

/// Holds the image shown by one reusable display element.
///
/// Lookups are never cancelled, so a slot reused for different content can
/// still receive the result of an older request. Each request records a fresh
/// [`RequestToken`]; results carrying any other token are dropped.
#[derive(Debug, Default)]
pub struct ImageSlot {
    intent: Option<Intent>,
    image: Option<LoadedImage>,
}

#[derive(Debug)]
struct Intent {
    token: RequestToken,
    url: String,
    settled: bool,
}

impl ImageSlot {
    /// Creates an empty slot with no request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the slot at `url` and returns the token its result must carry.
    pub fn begin(&mut self, url: impl Into<String>) -> RequestToken {
        let token = RequestToken::next();
        self.intent = Some(Intent {
            token,
            url: url.into(),
            settled: false,
        });
        self.image = None;
        token
    }

    /// Points the slot at `url` and starts the lookup.
    pub fn request(
        &mut self,
        cache: &TieredImageCache,
        url: &str,
        events: &mpsc::UnboundedSender<ImageLoadedEvent>,
    ) -> RequestToken {
        let token = self.begin(url);
        cache.lookup_into(url, token, events);
        token
    }

    /// Applies `event` if it answers the current request.
    ///
    /// Returns false for stale events, which leave the slot untouched.
    pub fn accept(&mut self, event: ImageLoadedEvent) -> bool {
        let Some(intent) = self.intent.as_mut().filter(|i| i.token == event.token) else {
            trace!(token = %event.token, url = %event.url, "Discarding stale image result");
            return false;
        };
        intent.settled = true;
        self.image = event.result;
        true
    }

    /// Forgets the current request and image.
    pub fn reset(&mut self) {
        self.intent = None;
        self.image = None;
    }

    /// Image of the current request, once it resolved to one.
    #[must_use]
    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    /// Address of the current request.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.url.as_str())
    }

    /// Token a result must carry to be accepted.
    #[must_use]
    pub fn token(&self) -> Option<RequestToken> {
        self.intent.as_ref().map(|i| i.token)
    }

    /// True while a request is outstanding; callers show a placeholder.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.intent.as_ref().is_some_and(|i| !i.settled)
    }

    /// True once the current request finished without an image.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.intent.as_ref().is_some_and(|i| i.settled) && self.image.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::entities::{CacheKey, ImageSource};
    use crate::domain::ports::mocks::{MockDiskTier, StaticOrigin};
    use crate::infrastructure::image::{MemoryImageCache, encode_png};

    fn event(token: RequestToken, url: &str, width: Option<u32>) -> ImageLoadedEvent {
        ImageLoadedEvent {
            token,
            url: url.to_string(),
            key: CacheKey::from_url(url),
            result: width.map(|w| LoadedImage {
                key: CacheKey::from_url(url),
                image: Arc::new(image::DynamicImage::new_rgb8(w, 1)),
                source: ImageSource::Network,
            }),
        }
    }

    #[test]
    fn test_accepts_matching_token() {
        let mut slot = ImageSlot::new();
        let token = slot.begin("https://img.example/a.png");
        assert!(slot.is_loading());

        assert!(slot.accept(event(token, "https://img.example/a.png", Some(3))));
        assert!(!slot.is_loading());
        assert_eq!(slot.image().unwrap().width(), 3);
    }

    #[test]
    fn test_discards_result_of_previous_request() {
        let mut slot = ImageSlot::new();
        let old = slot.begin("https://img.example/old.png");
        let new = slot.begin("https://img.example/new.png");

        assert!(!slot.accept(event(old, "https://img.example/old.png", Some(1))));
        assert!(slot.image().is_none());
        assert!(slot.is_loading());

        assert!(slot.accept(event(new, "https://img.example/new.png", Some(2))));
        assert_eq!(slot.image().unwrap().width(), 2);
        assert_eq!(slot.url(), Some("https://img.example/new.png"));
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut slot = ImageSlot::new();
        let token = slot.begin("https://img.example/a.png");
        slot.reset();

        assert!(!slot.accept(event(token, "https://img.example/a.png", Some(1))));
        assert!(slot.token().is_none());
        assert!(!slot.is_loading());
    }

    #[test]
    fn test_failed_lookup_marks_slot_failed() {
        let mut slot = ImageSlot::new();
        let token = slot.begin("https://img.example/gone.png");

        assert!(slot.accept(event(token, "https://img.example/gone.png", None)));
        assert!(slot.is_failed());
    }

    #[tokio::test]
    async fn test_reused_slot_ignores_late_result() {
        let origin = Arc::new(StaticOrigin::new());
        origin.serve(
            "https://img.example/first.png",
            encode_png(&image::DynamicImage::new_rgb8(1, 1)).unwrap(),
        );
        origin.serve(
            "https://img.example/second.png",
            encode_png(&image::DynamicImage::new_rgb8(2, 1)).unwrap(),
        );
        let cache = TieredImageCache::builder()
            .memory(Arc::new(MemoryImageCache::new(8)))
            .disk(Arc::new(MockDiskTier::new()))
            .origin(origin)
            .build()
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = ImageSlot::new();
        slot.request(&cache, "https://img.example/first.png", &tx);
        slot.request(&cache, "https://img.example/second.png", &tx);

        let mut accepted = 0;
        for _ in 0..2 {
            if slot.accept(rx.recv().await.unwrap()) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(slot.image().unwrap().width(), 2);
    }
}
