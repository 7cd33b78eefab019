//! In-flight lookup table used to coalesce concurrent misses for one key.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::domain::entities::{CacheKey, LoadedImage};

/// One-shot slot a waiting lookup receives its result through.
pub type Waiter = oneshot::Sender<Option<LoadedImage>>;

/// Outcome of joining the table.
#[derive(Debug)]
pub enum Flight {
    /// First lookup for the key: must resolve it and complete the guard.
    Leader(FlightGuard),
    /// A resolution is already running; the waiter was queued behind it.
    Follower,
}

/// Maps each key with a resolution in progress to the lookups waiting on it.
#[derive(Debug, Default)]
pub struct PendingLookups {
    inner: Mutex<HashMap<CacheKey, Vec<Waiter>>>,
}

impl PendingLookups {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `waiter` for `key`.
    #[must_use]
    pub fn join(self: &Arc<Self>, key: &CacheKey, waiter: Waiter) -> Flight {
        let mut map = self.inner.lock();
        match map.entry(key.clone()) {
            Entry::Occupied(mut waiting) => {
                waiting.get_mut().push(waiter);
                trace!(key = %key, waiters = waiting.get().len(), "Joined in-flight lookup");
                Flight::Follower
            }
            Entry::Vacant(slot) => {
                slot.insert(vec![waiter]);
                Flight::Leader(FlightGuard {
                    table: Arc::clone(self),
                    key: key.clone(),
                    completed: false,
                })
            }
        }
    }

    /// Returns the number of keys currently being resolved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `key` is being resolved.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    fn finish(&self, key: &CacheKey, result: &Option<LoadedImage>) -> usize {
        // Remove under the lock, send outside it.
        let waiters = self.inner.lock().remove(key).unwrap_or_default();
        let count = waiters.len();
        for waiter in waiters {
            // A dropped receiver means the caller lost interest.
            let _ = waiter.send(result.clone());
        }
        count
    }
}

/// Owned by the leader of a flight. Fans the result out to every waiter.
///
/// Dropping it without calling [`FlightGuard::complete`] (the resolving task
/// panicked or was cancelled) delivers `None` to every waiter.
#[derive(Debug)]
pub struct FlightGuard {
    table: Arc<PendingLookups>,
    key: CacheKey,
    completed: bool,
}

impl FlightGuard {
    /// Key this flight resolves.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Delivers `result` to every waiter and returns how many there were.
    pub fn complete(mut self, result: Option<LoadedImage>) -> usize {
        self.completed = true;
        self.table.finish(&self.key, &result)
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.completed {
            let count = self.table.finish(&self.key, &None);
            warn!(key = %self.key, waiters = count, "Lookup abandoned before completion");
        }
    }
}
