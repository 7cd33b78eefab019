//! HTTP origin tier.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::OriginPort;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches raw bytes over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    /// Creates an origin with the given timeout and user agent.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> CacheResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CacheError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginPort for HttpOrigin {
    async fn fetch(&self, url: &str) -> CacheResult<Bytes> {
        debug!(url = %url, "Downloading from origin");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::fetch(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::fetch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| CacheError::fetch(format!("Failed to read body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_creation() {
        let origin = HttpOrigin::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS), "oxicache-test");
        assert!(origin.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_fetch_error() {
        let origin = HttpOrigin::new(Duration::from_secs(1), "oxicache-test").unwrap();
        let err = origin.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, CacheError::Fetch(_)));
    }
}
