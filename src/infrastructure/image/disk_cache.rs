//! Disk-based image cache for persistence across sessions.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::DiskTierPort;

const ENTRY_EXTENSION: &str = "img";
const TEMP_EXTENSION: &str = "tmp";

/// Disk-based image cache that persists raw image bytes.
///
/// One file per key under a directory owned by this cache. The directory is
/// created on the first write. There is no size limit and no expiry: entries
/// stay until [`DiskTierPort::clear`] removes them.
#[derive(Debug, Clone)]
pub struct DiskImageCache {
    cache_dir: PathBuf,
}

/// Snapshot of what the disk tier currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Number of committed entries.
    pub entries: usize,
    /// Total size of committed entries in bytes.
    pub bytes: u64,
}

impl std::fmt::Display for DiskStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Disk: {} entries, {} bytes", self.entries, self.bytes)
    }
}

impl DiskImageCache {
    /// Creates a disk cache rooted at `cache_dir`. Nothing is touched on disk yet.
    #[must_use]
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Creates a cache in the default location (the platform cache dir + `images`).
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(crate::infrastructure::config::CacheConfig::default_cache_dir())
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached entry.
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    /// Unique scratch path in the cache directory.
    ///
    /// Independent of the key, so any key whose entry name is legal also
    /// has a legal scratch name.
    fn temp_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!(".{}.{TEMP_EXTENSION}", uuid::Uuid::new_v4().simple()))
    }

    async fn ensure_dir(&self) -> CacheResult<()> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CacheError::io(format!("Failed to create cache dir: {e}")))
    }

    async fn write_temp(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }

    /// Scans the directory and reports entry count and total size.
    ///
    /// # Errors
    /// Returns error if the directory exists but cannot be read.
    pub async fn stats(&self) -> CacheResult<DiskStats> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DiskStats::default()),
            Err(e) => return Err(CacheError::io(format!("Failed to read cache dir: {e}"))),
        };

        let mut stats = DiskStats::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
                && let Ok(meta) = entry.metadata().await
            {
                stats.entries += 1;
                stats.bytes += meta.len();
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl DiskTierPort for DiskImageCache {
    async fn get_bytes(&self, key: &CacheKey) -> CacheResult<Option<Bytes>> {
        let path = self.cache_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Ok(Some(Bytes::from(bytes)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(key = %key, "Disk cache miss");
                Ok(None)
            }
            Err(e) => Err(CacheError::io(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn put_bytes(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<()> {
        self.ensure_dir().await?;

        let path = self.cache_path(key);
        let temp = self.temp_path();

        if let Err(e) = Self::write_temp(&temp, bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(CacheError::io(format!("Failed to write cache file: {e}")));
        }

        // Rename is the commit point: readers see the old entry or the new one.
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(CacheError::io(format!("Failed to commit cache file: {e}")));
        }

        debug!(key = %key, path = %path.display(), size = bytes.len(), "Stored image in disk cache");
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::io(format!("Failed to read cache dir: {e}"))),
        };

        let mut removed = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            let owned = path
                .extension()
                .is_some_and(|ext| ext == ENTRY_EXTENSION || ext == TEMP_EXTENSION);
            if !owned {
                continue;
            }
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove cache file");
            } else {
                removed += 1;
            }
        }
        debug!(removed, "Cleared disk cache");
        Ok(())
    }
}
