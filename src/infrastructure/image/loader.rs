//! Async image lookup orchestrator.
//!
//! Implements a three-tier cache: Memory -> Disk -> Network.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, debug_span, info, trace, warn};

use crate::domain::entities::{
    CacheKey, ImageLoadedEvent, ImageSource, KeyStrategy, LoadedImage, RequestToken, SharedImage,
};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{DiskTierPort, ImageDecoderPort, MemoryTierPort, OriginPort};
use crate::infrastructure::config::CacheConfig;

use super::codec::ImageCrateDecoder;
use super::disk_cache::DiskImageCache;
use super::http_origin::HttpOrigin;
use super::memory_cache::MemoryImageCache;
use super::pending::{Flight, PendingLookups};

/// Process-wide image cache composed of a memory, a disk and an origin tier.
///
/// Cloning is cheap and every clone shares the same tiers, so one instance is
/// built at startup and handed to every renderer that needs images. Lookups
/// never block the calling thread: disk and network work runs on the tokio
/// runtime captured at construction. In-flight work is never cancelled, and
/// every lookup is answered exactly once.
#[derive(Clone)]
pub struct TieredImageCache {
    inner: Arc<Inner>,
}

struct Inner {
    memory: Arc<dyn MemoryTierPort>,
    disk: Arc<dyn DiskTierPort>,
    origin: Arc<dyn OriginPort>,
    decoder: Arc<dyn ImageDecoderPort>,
    key_strategy: KeyStrategy,
    pending: Arc<PendingLookups>,
    counters: Counters,
    runtime: Handle,
}

#[derive(Default)]
struct Counters {
    lookups: AtomicU64,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    origin_fetches: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Lookup counters since the cache was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Total lookups issued.
    pub lookups: u64,
    /// Lookups answered by the memory tier.
    pub memory_hits: u64,
    /// Resolutions answered by the disk tier.
    pub disk_hits: u64,
    /// Requests sent to the origin.
    pub origin_fetches: u64,
    /// Lookups that joined an in-flight resolution instead of starting one.
    pub coalesced: u64,
    /// Resolutions that ended with an empty result.
    pub failures: u64,
}

impl std::fmt::Display for LookupStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Lookups: {} ({} memory, {} disk, {} origin, {} coalesced, {} failed)",
            self.lookups,
            self.memory_hits,
            self.disk_hits,
            self.origin_fetches,
            self.coalesced,
            self.failures
        )
    }
}

impl std::fmt::Debug for TieredImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredImageCache")
            .field("key_strategy", &self.inner.key_strategy)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for [`TieredImageCache`]. Unset tiers get their default implementation.
#[derive(Default)]
pub struct TieredImageCacheBuilder {
    memory: Option<Arc<dyn MemoryTierPort>>,
    disk: Option<Arc<dyn DiskTierPort>>,
    origin: Option<Arc<dyn OriginPort>>,
    decoder: Option<Arc<dyn ImageDecoderPort>>,
    key_strategy: KeyStrategy,
    runtime: Option<Handle>,
}

impl TieredImageCacheBuilder {
    /// Sets the memory tier.
    #[must_use]
    pub fn memory(mut self, memory: Arc<dyn MemoryTierPort>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Sets the disk tier.
    #[must_use]
    pub fn disk(mut self, disk: Arc<dyn DiskTierPort>) -> Self {
        self.disk = Some(disk);
        self
    }

    /// Sets the origin tier.
    #[must_use]
    pub fn origin(mut self, origin: Arc<dyn OriginPort>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Sets the byte-to-image decoder.
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn ImageDecoderPort>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets how addresses map to keys.
    #[must_use]
    pub fn key_strategy(mut self, key_strategy: KeyStrategy) -> Self {
        self.key_strategy = key_strategy;
        self
    }

    /// Sets the runtime that runs disk, network and decode work.
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the cache.
    ///
    /// # Errors
    /// Returns error if no runtime was given and none is current, or if the
    /// default origin cannot be created.
    pub fn build(self) -> CacheResult<TieredImageCache> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()
                .map_err(|e| CacheError::Config(format!("No tokio runtime available: {e}")))?,
        };

        let origin: Arc<dyn OriginPort> = match self.origin {
            Some(origin) => origin,
            None => Arc::new(HttpOrigin::new(
                Duration::from_secs(super::http_origin::DEFAULT_TIMEOUT_SECS),
                crate::DEFAULT_USER_AGENT,
            )?),
        };

        Ok(TieredImageCache {
            inner: Arc::new(Inner {
                memory: self
                    .memory
                    .unwrap_or_else(|| Arc::new(MemoryImageCache::with_default_capacity())),
                disk: self
                    .disk
                    .unwrap_or_else(|| Arc::new(DiskImageCache::default_location())),
                origin,
                decoder: self.decoder.unwrap_or_else(|| Arc::new(ImageCrateDecoder)),
                key_strategy: self.key_strategy,
                pending: Arc::new(PendingLookups::new()),
                counters: Counters::default(),
                runtime,
            }),
        })
    }
}

impl TieredImageCache {
    /// Starts building a cache.
    #[must_use]
    pub fn builder() -> TieredImageCacheBuilder {
        TieredImageCacheBuilder::default()
    }

    /// Builds a cache with the standard tiers from configuration.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created or no runtime is current.
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let origin = HttpOrigin::new(
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )?;

        info!(
            dir = %config.effective_cache_dir().display(),
            capacity = config.memory_capacity,
            keys = %config.key_strategy,
            "Image cache configured"
        );

        Self::builder()
            .memory(Arc::new(MemoryImageCache::new(config.memory_capacity)))
            .disk(Arc::new(DiskImageCache::new(config.effective_cache_dir())))
            .origin(Arc::new(origin))
            .key_strategy(config.key_strategy)
            .build()
    }

    /// Returns the key `url` is stored under.
    #[must_use]
    pub fn key_for(&self, url: &str) -> CacheKey {
        self.inner.key_strategy.derive(url)
    }

    /// Looks up `url` through every tier.
    ///
    /// A memory hit returns an already-resolved lookup without touching the
    /// runtime. Otherwise the disk and origin tiers are consulted on a worker
    /// task; concurrent lookups of the same key share that task.
    pub fn lookup(&self, url: &str) -> ImageLookup {
        bump(&self.inner.counters.lookups);
        let key = self.key_for(url);

        if let Some(image) = self.inner.memory.get(&key) {
            bump(&self.inner.counters.memory_hits);
            trace!(key = %key, "Served from memory");
            return ImageLookup::ready(Some(LoadedImage {
                key,
                image,
                source: ImageSource::MemoryCache,
            }));
        }

        let (tx, rx) = oneshot::channel();
        match self.inner.pending.join(&key, tx) {
            Flight::Leader(guard) => {
                let inner = Arc::clone(&self.inner);
                let url = url.to_owned();
                let span = debug_span!("resolve", key = %key);
                self.inner.runtime.spawn(
                    async move {
                        let result = inner.resolve(guard.key(), &url).await;
                        let waiters = guard.complete(result);
                        trace!(waiters, "Lookup completed");
                    }
                    .instrument(span),
                );
            }
            Flight::Follower => bump(&self.inner.counters.coalesced),
        }

        ImageLookup::pending(rx)
    }

    /// Looks up `url` and sends the outcome to `events` as one
    /// [`ImageLoadedEvent`] tagged with `token`.
    ///
    /// Exactly one event is sent per call, including for memory hits and
    /// failures. The receiver decides whether the result is still wanted.
    pub fn lookup_into(
        &self,
        url: &str,
        token: RequestToken,
        events: &mpsc::UnboundedSender<ImageLoadedEvent>,
    ) {
        let key = self.key_for(url);
        let url = url.to_owned();

        match self.lookup(&url).into_ready() {
            Ok(result) => send_event(events, token, url, key, result),
            Err(lookup) => {
                let events = events.clone();
                self.inner.runtime.spawn(async move {
                    let result = lookup.await;
                    send_event(&events, token, url, key, result);
                });
            }
        }
    }

    /// Returns the image for `url` if the memory tier holds it. Never suspends.
    #[must_use]
    pub fn cached(&self, url: &str) -> Option<SharedImage> {
        self.inner.memory.get(&self.key_for(url))
    }

    /// Warms the tiers for `url` without waiting for the result.
    pub fn prefetch(&self, url: &str) {
        drop(self.lookup(url));
    }

    /// Returns true if a disk or origin resolution for `url` is running.
    #[must_use]
    pub fn is_loading(&self, url: &str) -> bool {
        self.inner.pending.contains(&self.key_for(url))
    }

    /// Returns the number of keys being resolved.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Returns lookup counters.
    #[must_use]
    pub fn stats(&self) -> LookupStats {
        let c = &self.inner.counters;
        LookupStats {
            lookups: c.lookups.load(Ordering::Relaxed),
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            disk_hits: c.disk_hits.load(Ordering::Relaxed),
            origin_fetches: c.origin_fetches.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
        }
    }

    /// Empties the memory tier. Disk entries are kept.
    pub fn clear_memory(&self) {
        self.inner.memory.clear();
    }

    /// Removes every entry from the memory and disk tiers.
    ///
    /// # Errors
    /// Returns error if the disk directory cannot be read.
    pub async fn purge(&self) -> CacheResult<()> {
        self.inner.memory.clear();
        self.inner.disk.clear().await?;
        info!("Purged all image caches");
        Ok(())
    }
}

fn send_event(
    events: &mpsc::UnboundedSender<ImageLoadedEvent>,
    token: RequestToken,
    url: String,
    key: CacheKey,
    result: Option<LoadedImage>,
) {
    let event = ImageLoadedEvent {
        token,
        url,
        key,
        result,
    };
    if events.send(event).is_err() {
        debug!(token = %token, "Event receiver dropped; discarding result");
    }
}

impl Inner {
    async fn resolve(&self, key: &CacheKey, url: &str) -> Option<LoadedImage> {
        // A flight for this key may have finished between our memory miss and
        // taking the lead.
        if let Some(image) = self.memory.get(key) {
            bump(&self.counters.memory_hits);
            return Some(LoadedImage {
                key: key.clone(),
                image,
                source: ImageSource::MemoryCache,
            });
        }

        if let Some(image) = self.load_from_disk(key).await {
            bump(&self.counters.disk_hits);
            self.memory.put(key.clone(), Arc::clone(&image));
            debug!(key = %key, source = %ImageSource::DiskCache, "Image loaded");
            return Some(LoadedImage {
                key: key.clone(),
                image,
                source: ImageSource::DiskCache,
            });
        }

        match self.load_from_origin(key, url).await {
            Ok(image) => {
                debug!(key = %key, source = %ImageSource::Network, "Image loaded");
                Some(LoadedImage {
                    key: key.clone(),
                    image,
                    source: ImageSource::Network,
                })
            }
            Err(e) => {
                bump(&self.counters.failures);
                warn!(key = %key, url = %url, kind = e.kind(), error = %e, "Lookup failed");
                None
            }
        }
    }

    /// Disk hit that decodes, or `None`. Read and decode failures count as misses.
    async fn load_from_disk(&self, key: &CacheKey) -> Option<SharedImage> {
        let bytes = match self.disk.get_bytes(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Disk read failed, treating as miss");
                return None;
            }
        };

        match self.decode(bytes).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached bytes are not an image, refetching");
                None
            }
        }
    }

    async fn load_from_origin(&self, key: &CacheKey, url: &str) -> CacheResult<SharedImage> {
        bump(&self.counters.origin_fetches);
        let bytes = self.origin.fetch(url).await?;
        let image = self.decode(bytes.clone()).await?;

        // Persistence is best effort; the caller still gets the image.
        if let Err(e) = self.disk.put_bytes(key, &bytes).await {
            warn!(key = %key, error = %e, "Failed to cache to disk");
        }

        self.memory.put(key.clone(), Arc::clone(&image));
        Ok(image)
    }

    async fn decode(&self, bytes: Bytes) -> CacheResult<SharedImage> {
        let decoder = Arc::clone(&self.decoder);
        tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| CacheError::decode(format!("Decode task panicked: {e}")))?
            .map(Arc::new)
    }
}

/// Single-resolution handle to a pending lookup.
///
/// Resolves to `None` when every tier failed, including when the worker
/// resolving it died before answering.
#[derive(Debug)]
#[must_use = "a lookup does nothing useful unless awaited"]
pub struct ImageLookup {
    state: LookupState,
}

#[derive(Debug)]
enum LookupState {
    Ready(Option<LoadedImage>),
    Pending(oneshot::Receiver<Option<LoadedImage>>),
}

impl ImageLookup {
    fn ready(result: Option<LoadedImage>) -> Self {
        Self {
            state: LookupState::Ready(result),
        }
    }

    fn pending(rx: oneshot::Receiver<Option<LoadedImage>>) -> Self {
        Self {
            state: LookupState::Pending(rx),
        }
    }

    /// Returns true if the result was available at call time (memory hit).
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, LookupState::Ready(_))
    }

    /// Takes the result if it was available at call time.
    ///
    /// # Errors
    /// Returns the lookup unchanged if it still has to be awaited.
    pub fn into_ready(self) -> Result<Option<LoadedImage>, Self> {
        match self.state {
            LookupState::Ready(result) => Ok(result),
            LookupState::Pending(_) => Err(self),
        }
    }
}

impl Future for ImageLookup {
    type Output = Option<LoadedImage>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            LookupState::Ready(result) => Poll::Ready(result.take()),
            LookupState::Pending(rx) => Pin::new(rx).poll(cx).map(Result::unwrap_or_default),
        }
    }
}
