//! In-memory TTL store.

use dashmap::DashMap;
use onager_core::{BoxFuture, CacheEntry, CacheError, CacheStore, CallResponse};
use std::time::{Duration, Instant};

/// A shared in-memory [`CacheStore`] on a concurrent map.
///
/// Expired entries are evicted lazily, on the read that finds them; there
/// is no background sweeper. Concurrent writes to the same key are
/// last-write-wins, which the pipeline tolerates given the TTL-bounded
/// entry lifetime.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of resident entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry.
    ///
    /// Lazy read-time eviction keeps correctness on its own; this exists
    /// for callers that want to bound memory between reads.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

impl CacheStore for MemoryCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>> {
        Box::pin(async move {
            match self.entries.get(key) {
                Some(entry) if entry.is_expired(Instant::now()) => {
                    drop(entry);
                    self.entries.remove(key);
                    tracing::trace!(key, "expired entry evicted");
                    Ok(None)
                }
                Some(entry) => Ok(Some(entry.clone())),
                None => Ok(None),
            }
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: CallResponse,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.entries
                .insert(key.to_string(), CacheEntry::new(value, ttl));
            Ok(())
        })
    }
}
