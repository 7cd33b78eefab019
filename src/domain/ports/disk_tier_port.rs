//! Port definition for the persistent byte tier.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::CacheKey;
use crate::domain::errors::CacheResult;

/// Persistent key to raw-bytes map.
///
/// Entries are never expired by the tier itself; once written they stay valid
/// until removed with [`DiskTierPort::clear`].
#[async_trait]
pub trait DiskTierPort: Send + Sync {
    /// Reads the bytes stored under `key`.
    ///
    /// A missing entry is `Ok(None)`. Any other filesystem failure is
    /// [`CacheError::Io`](crate::domain::errors::CacheError::Io).
    async fn get_bytes(&self, key: &CacheKey) -> CacheResult<Option<Bytes>>;

    /// Stores `bytes` under `key`, fully replacing any previous entry.
    async fn put_bytes(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<()>;

    /// Removes every entry.
    async fn clear(&self) -> CacheResult<()>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::domain::errors::CacheError;

    /// In-memory disk tier that counts every call.
    #[derive(Default)]
    pub struct MockDiskTier {
        entries: Mutex<HashMap<CacheKey, Bytes>>,
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MockDiskTier {
        /// Creates an empty tier.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a tier pre-populated with one entry.
        pub fn with_entry(key: CacheKey, bytes: impl Into<Bytes>) -> Self {
            let tier = Self::new();
            tier.entries.lock().insert(key, bytes.into());
            tier
        }

        /// Makes every read fail with an I/O error.
        pub fn fail_reads(&self) {
            self.fail_reads.store(true, Ordering::SeqCst);
        }

        /// Makes every write fail with an I/O error.
        pub fn fail_writes(&self) {
            self.fail_writes.store(true, Ordering::SeqCst);
        }

        /// Number of `get_bytes` calls so far.
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        /// Number of `put_bytes` calls so far.
        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Returns the stored bytes without counting a read.
        pub fn stored(&self, key: &CacheKey) -> Option<Bytes> {
            self.entries.lock().get(key).cloned()
        }
    }

    #[async_trait]
    impl DiskTierPort for MockDiskTier {
        async fn get_bytes(&self, key: &CacheKey) -> CacheResult<Option<Bytes>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(CacheError::io("permission denied"));
            }
            Ok(self.entries.lock().get(key).cloned())
        }

        async fn put_bytes(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::io("no space left on device"));
            }
            self.entries
                .lock()
                .insert(key.clone(), Bytes::copy_from_slice(bytes));
            Ok(())
        }

        async fn clear(&self) -> CacheResult<()> {
            self.entries.lock().clear();
            Ok(())
        }
    }
}
