//! Read-through/write-through response caching.
//!
//! Contract, in order:
//!
//! - The key is a pure function of method + payload via the configured
//!   [`KeyGenerator`].
//! - Read path: an un-expired hit is returned without invoking the
//!   continuation (the dispatcher is skipped entirely), annotated with the
//!   `x-cache: hit` metadata pair. Expiry is enforced here, not in the
//!   store: a store that physically retains a stale entry still produces a
//!   miss.
//! - Miss path: the continuation runs. Errors propagate unchanged and
//!   nothing is written; a success is written `(key, response, ttl)` before
//!   being returned.
//! - Degradation: a store failure on read counts as a miss, a store
//!   failure on write is logged and the success still returned. Caching is
//!   a best-effort optimization, never a call-correctness dependency.
//!
//! Store calls honor the envelope deadline: a read that outlives it counts
//! as a miss, a write that outlives it is skipped. There is no write-behind
//! and no background eviction; expiry is lazy, at read time.

use crate::interceptor::{Interceptor, InterceptorKind, Next};
use onager_core::{
    metadata, BoxFuture, CacheStore, CallContext, CallEnvelope, CallResponse, CallResult,
    KeyGenerator,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Serves repeated calls from a [`CacheStore`], falling through to the
/// dispatcher on miss.
pub struct CacheAsideInterceptor {
    store: Arc<dyn CacheStore>,
    key_generator: Arc<dyn KeyGenerator>,
    ttl: Duration,
}

impl CacheAsideInterceptor {
    /// Creates a cache-aside interceptor.
    ///
    /// The builder has already rejected a zero TTL by the time this runs.
    #[must_use]
    pub fn new(
        store: Arc<dyn CacheStore>,
        key_generator: Arc<dyn KeyGenerator>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            key_generator,
            ttl,
        }
    }

    /// Read path. `None` is a miss, whether genuine, stale, failed, or
    /// timed out.
    async fn read(&self, key: &str, deadline: Option<Instant>) -> Option<CallResponse> {
        let fut = self.store.get(key);
        let fetched = match remaining(deadline) {
            Some(budget) => match tokio::time::timeout(budget, fut).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(key, "cache read outlived the call deadline, treating as miss");
                    return None;
                }
            },
            None => fut.await,
        };

        match fetched {
            Ok(Some(entry)) if !entry.is_expired(Instant::now()) => Some(entry.value),
            Ok(Some(_)) => {
                tracing::debug!(key, "cache entry expired, treating as miss");
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write path. Failures are observed, never surfaced.
    async fn write(&self, key: &str, response: CallResponse, deadline: Option<Instant>) {
        let fut = self.store.set(key, response, self.ttl);
        let written = match remaining(deadline) {
            Some(budget) => match tokio::time::timeout(budget, fut).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(key, "cache write outlived the call deadline, skipped");
                    return;
                }
            },
            None => fut.await,
        };

        if let Err(err) = written {
            tracing::warn!(key, error = %err, "cache write failed, response served uncached");
        }
    }
}

/// Time left before `deadline`, if one is set.
fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

impl Interceptor for CacheAsideInterceptor {
    fn name(&self) -> &'static str {
        "cache_aside"
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::CacheAside
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        Box::pin(async move {
            let key = self.key_generator.generate(&envelope);
            let deadline = envelope.deadline();

            if let Some(mut cached) = self.read(&key, deadline).await {
                tracing::debug!(key, method = %envelope.method(), "cache hit");
                cached.insert_metadata(metadata::CACHE_STATUS, metadata::CACHE_HIT);
                return Ok(cached);
            }

            let result = next.run(ctx, envelope).await;
            match result {
                Ok(response) => {
                    self.write(&key, response.clone(), deadline).await;
                    Ok(response)
                }
                // Only successful responses are cacheable.
                Err(err) => Err(err),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onager_core::{CacheEntry, CacheError, CallError};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal in-memory store used to observe interceptor behavior.
    #[derive(Default)]
    struct MapStore {
        entries: Mutex<HashMap<String, CacheEntry>>,
    }

    impl CacheStore for MapStore {
        fn get<'a>(
            &'a self,
            key: &'a str,
        ) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>> {
            Box::pin(async move { Ok(self.entries.lock().get(key).cloned()) })
        }

        fn set<'a>(
            &'a self,
            key: &'a str,
            value: CallResponse,
            ttl: Duration,
        ) -> BoxFuture<'a, Result<(), CacheError>> {
            Box::pin(async move {
                self.entries
                    .lock()
                    .insert(key.to_string(), CacheEntry::new(value, ttl));
                Ok(())
            })
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get<'a>(
            &'a self,
            _key: &'a str,
        ) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>> {
            Box::pin(async { Err(CacheError::new("read refused")) })
        }

        fn set<'a>(
            &'a self,
            _key: &'a str,
            _value: CallResponse,
            _ttl: Duration,
        ) -> BoxFuture<'a, Result<(), CacheError>> {
            Box::pin(async { Err(CacheError::new("write refused")) })
        }
    }

    /// A store that always returns one fixed entry, stale or not.
    struct PinnedStore {
        entry: CacheEntry,
    }

    impl CacheStore for PinnedStore {
        fn get<'a>(
            &'a self,
            _key: &'a str,
        ) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>> {
            Box::pin(async move { Ok(Some(self.entry.clone())) })
        }

        fn set<'a>(
            &'a self,
            _key: &'a str,
            _value: CallResponse,
            _ttl: Duration,
        ) -> BoxFuture<'a, Result<(), CacheError>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct MethodPayloadKey;

    impl KeyGenerator for MethodPayloadKey {
        fn generate(&self, envelope: &CallEnvelope) -> String {
            format!(
                "{}:{}",
                envelope.method(),
                String::from_utf8_lossy(envelope.payload())
            )
        }
    }

    fn interceptor(store: Arc<dyn CacheStore>) -> CacheAsideInterceptor {
        CacheAsideInterceptor::new(store, Arc::new(MethodPayloadKey), Duration::from_secs(3600))
    }

    /// Runs one call through the interceptor into a counting echo dispatcher.
    async fn call(
        cache: &CacheAsideInterceptor,
        counter: Arc<AtomicUsize>,
        fails: bool,
    ) -> CallResult {
        let mut ctx = CallContext::new("Echo");
        let next = Next::dispatch(move |_ctx, envelope| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if fails {
                    Err(CallError::internal("dispatcher failed"))
                } else {
                    Ok(CallResponse::new(envelope.payload().clone()))
                }
            })
        });
        cache
            .process(&mut ctx, CallEnvelope::new("Echo", "hi"), next)
            .await
    }

    #[tokio::test]
    async fn second_call_within_ttl_skips_dispatcher() {
        let cache = interceptor(Arc::new(MapStore::default()));
        let counter = Arc::new(AtomicUsize::new(0));

        let first = call(&cache, Arc::clone(&counter), false).await.unwrap();
        assert!(!first.is_cache_hit());

        let second = call(&cache, Arc::clone(&counter), false).await.unwrap();
        assert!(second.is_cache_hit());
        assert_eq!(second.payload(), first.payload());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_from_store_is_a_miss() {
        let stale = CacheEntry {
            value: CallResponse::new("old"),
            created_at: Instant::now() - Duration::from_secs(7200),
            ttl: Duration::from_secs(3600),
        };
        let cache = interceptor(Arc::new(PinnedStore { entry: stale }));
        let counter = Arc::new(AtomicUsize::new(0));

        let response = call(&cache, Arc::clone(&counter), false).await.unwrap();
        assert_eq!(response.payload().as_ref(), b"hi");
        assert!(!response.is_cache_hit());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_pinned_entry_is_served() {
        let fresh = CacheEntry::new(CallResponse::new("cached"), Duration::from_secs(3600));
        let cache = interceptor(Arc::new(PinnedStore { entry: fresh }));
        let counter = Arc::new(AtomicUsize::new(0));

        let response = call(&cache, Arc::clone(&counter), false).await.unwrap();
        assert_eq!(response.payload().as_ref(), b"cached");
        assert!(response.is_cache_hit());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = interceptor(Arc::new(MapStore::default()));
        let counter = Arc::new(AtomicUsize::new(0));

        assert!(call(&cache, Arc::clone(&counter), true).await.is_err());
        assert!(call(&cache, Arc::clone(&counter), true).await.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broken_store_never_fails_the_call() {
        let cache = interceptor(Arc::new(BrokenStore));
        let counter = Arc::new(AtomicUsize::new(0));

        let first = call(&cache, Arc::clone(&counter), false).await.unwrap();
        assert_eq!(first.payload().as_ref(), b"hi");
        let second = call(&cache, Arc::clone(&counter), false).await.unwrap();
        assert_eq!(second.payload().as_ref(), b"hi");
        // Nothing was ever cached, so both calls reached the dispatcher.
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    struct HangingStore;

    impl CacheStore for HangingStore {
        fn get<'a>(
            &'a self,
            _key: &'a str,
        ) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            })
        }

        fn set<'a>(
            &'a self,
            _key: &'a str,
            _value: CallResponse,
            _ttl: Duration,
        ) -> BoxFuture<'a, Result<(), CacheError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
        }
    }

    /// Reads miss instantly; writes hang and record whether they finished.
    #[derive(Default)]
    struct HangingWriteStore {
        wrote: std::sync::atomic::AtomicBool,
    }

    impl CacheStore for HangingWriteStore {
        fn get<'a>(
            &'a self,
            _key: &'a str,
        ) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>> {
            Box::pin(async { Ok(None) })
        }

        fn set<'a>(
            &'a self,
            _key: &'a str,
            _value: CallResponse,
            _ttl: Duration,
        ) -> BoxFuture<'a, Result<(), CacheError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                self.wrote.store(true, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_write_is_skipped_at_deadline() {
        let store = Arc::new(HangingWriteStore::default());
        let cache = interceptor(Arc::clone(&store) as Arc<dyn CacheStore>);
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_inner = Arc::clone(&counter);

        let mut ctx = CallContext::new("Echo");
        let next = Next::dispatch(move |_ctx, envelope| {
            counter_inner.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(CallResponse::new(envelope.payload().clone())) })
        });

        let envelope = CallEnvelope::new("Echo", "hi")
            .with_deadline(Instant::now() + Duration::from_millis(100));
        let response = cache.process(&mut ctx, envelope, next).await.unwrap();

        // The success is still served; the write was abandoned mid-flight.
        assert_eq!(response.payload().as_ref(), b"hi");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!store.wrote.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_store_honors_deadline_as_miss() {
        let cache = interceptor(Arc::new(HangingStore));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_inner = Arc::clone(&counter);

        let mut ctx = CallContext::new("Echo");
        let next = Next::dispatch(move |_ctx, envelope| {
            counter_inner.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(CallResponse::new(envelope.payload().clone())) })
        });

        let envelope = CallEnvelope::new("Echo", "hi")
            .with_deadline(Instant::now() + Duration::from_millis(100));
        let response = cache.process(&mut ctx, envelope, next).await.unwrap();
        assert_eq!(response.payload().as_ref(), b"hi");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
