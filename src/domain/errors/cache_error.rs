//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Internal failure causes of a tier.
///
/// None of these reach a lookup caller; they are logged and folded into an
/// empty result at the orchestration boundary.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Filesystem failure other than a missing file.
    #[error("io error: {0}")]
    Io(String),
    /// Transport failure, timeout or non-success status from the origin.
    #[error("fetch error: {0}")]
    Fetch(String),
    /// Bytes were present but are not a valid image.
    #[error("decode error: {0}")]
    Decode(String),
    /// The cache could not be constructed from its configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Creates an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Short label for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Fetch(_) => "fetch",
            Self::Decode(_) => "decode",
            Self::Config(_) => "config",
        }
    }
}
