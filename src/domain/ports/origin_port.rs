//! Port definition for origin retrieval.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::CacheResult;

/// Pull-through source of raw bytes for addresses neither cache tier holds.
///
/// A failed fetch is reported once and never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OriginPort: Send + Sync {
    /// Fetches the full payload at `url`.
    async fn fetch(&self, url: &str) -> CacheResult<Bytes>;
}
