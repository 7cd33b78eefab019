//! Cache key derivation.

use serde::{Deserialize, Serialize};

/// Identifier addressing an entry in the memory and disk tiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from an already-derived string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Creates a key from a URL by hashing the full address.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16]))
    }

    /// Creates a key from the final path segment of a URL.
    ///
    /// Query string and fragment are ignored, so two addresses that differ only
    /// by host or query collapse onto the same key. Falls back to the hashed key
    /// when the address has no usable segment.
    #[must_use]
    pub fn from_last_segment(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let path = path.split_once("://").map_or(path, |(_, rest)| {
            rest.split_once('/').map_or("", |(_, p)| p)
        });

        match path.rsplit('/').next() {
            Some(segment) if is_safe_file_name(segment) => Self(segment.to_string()),
            _ => Self::from_url(url),
        }
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_safe_file_name(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.starts_with('.')
        && !segment.contains(['\\', '\0'])
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// How a cache instance turns a resource address into a [`CacheKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// SHA-256 of the full address.
    #[default]
    Hashed,
    /// Final path segment of the address.
    ///
    /// Matches the flat file layout of older cache directories. Distinct
    /// addresses sharing a file name collide and serve each other's bytes.
    /// The memory tier is keyed the same way, so the colliding address is
    /// answered from memory once the first one is loaded.
    LastPathSegment,
}

impl KeyStrategy {
    /// Derives the key for `url`.
    #[must_use]
    pub fn derive(self, url: &str) -> CacheKey {
        match self {
            Self::Hashed => CacheKey::from_url(url),
            Self::LastPathSegment => CacheKey::from_last_segment(url),
        }
    }
}

impl std::fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hashed => write!(f, "hashed"),
            Self::LastPathSegment => write!(f, "last-path-segment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_key_from_url() {
        let key = CacheKey::from_url("https://example.com/photos/image.png");
        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hashed_key_consistency() {
        let url = "https://example.com/image.png";
        assert_eq!(KeyStrategy::Hashed.derive(url), KeyStrategy::Hashed.derive(url));
    }

    #[test]
    fn test_hashed_keys_differ_by_query() {
        let a = KeyStrategy::Hashed.derive("https://example.com/image.png?size=1");
        let b = KeyStrategy::Hashed.derive("https://example.com/image.png?size=2");
        assert_ne!(a, b);
    }

    #[test_case("https://example.com/a/b/photo.jpg", "photo.jpg" ; "plain")]
    #[test_case("https://example.com/photo.jpg?w=100", "photo.jpg" ; "query_stripped")]
    #[test_case("https://example.com/photo.jpg#top", "photo.jpg" ; "fragment_stripped")]
    #[test_case("https://cdn.other.net/x/photo.jpg", "photo.jpg" ; "host_ignored")]
    #[test_case("/local/avatar.png", "avatar.png" ; "bare_path")]
    fn test_last_segment(url: &str, expected: &str) {
        assert_eq!(KeyStrategy::LastPathSegment.derive(url).as_str(), expected);
    }

    #[test_case("https://example.com/" ; "trailing_slash")]
    #[test_case("https://example.com" ; "no_path")]
    #[test_case("https://example.com/a/.." ; "parent_dir")]
    #[test_case("https://example.com/.hidden" ; "dot_file")]
    fn test_last_segment_falls_back_to_hash(url: &str) {
        assert_eq!(
            KeyStrategy::LastPathSegment.derive(url),
            CacheKey::from_url(url)
        );
    }

    #[test]
    fn test_last_segment_collides_across_hosts() {
        let a = KeyStrategy::LastPathSegment.derive("https://a.example/img/1.png");
        let b = KeyStrategy::LastPathSegment.derive("https://b.example/other/1.png");
        assert_eq!(a, b);
    }
}
