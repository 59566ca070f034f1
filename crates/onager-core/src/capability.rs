//! External capability traits.
//!
//! The pipeline consumes these as pluggable collaborators. It never assumes
//! exclusive access to a store or limiter: both are shared across all
//! concurrent calls and are expected to be internally synchronized.

use crate::{BoxFuture, CallEnvelope, CallError, CallIdentity, CallResponse, Metadata};
use std::time::{Duration, Instant};
use thiserror::Error;

/// A failure inside a cache backend.
///
/// Deliberately not part of the [`CallError`] taxonomy: the cache-aside
/// interceptor absorbs these per its degradation policy, surfacing them only
/// through logging and metrics.
#[derive(Error, Debug)]
#[error("cache backend error: {message}")]
pub struct CacheError {
    /// Human-readable failure description.
    pub message: String,
}

impl CacheError {
    /// Creates a cache backend error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One cached response with its freshness bookkeeping.
///
/// Expiry is advisory for the store and authoritative for the interceptor:
/// a store may physically retain a stale entry, and the interceptor must
/// still treat it as a miss.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached response.
    pub value: CallResponse,
    /// When the entry was written.
    pub created_at: Instant,
    /// How long the entry stays servable after `created_at`.
    pub ttl: Duration,
}

impl CacheEntry {
    /// Creates an entry written now.
    #[must_use]
    pub fn new(value: CallResponse, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Returns `true` once `now > created_at + ttl`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.created_at + self.ttl
    }
}

/// Get/set with TTL. May be absent, slow, or failing; the pipeline treats
/// every failure as a miss or a skipped write, never as a call failure.
pub trait CacheStore: Send + Sync + 'static {
    /// Looks up `key`. `Ok(None)` is a miss.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CacheEntry>, CacheError>>;

    /// Writes `value` under `key` with the given TTL.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: CallResponse,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}

/// Admission decision per call identity.
///
/// State behind the limiter outlives individual calls and is shared across
/// all concurrent calls.
pub trait RateLimiter: Send + Sync + 'static {
    /// Returns `true` if the identity is currently admitted.
    fn allow(&self, identity: &CallIdentity) -> bool;
}

impl<F> RateLimiter for F
where
    F: Fn(&CallIdentity) -> bool + Send + Sync + 'static,
{
    fn allow(&self, identity: &CallIdentity) -> bool {
        self(identity)
    }
}

/// Verifies caller credentials from call metadata.
pub trait AuthVerifier: Send + Sync + 'static {
    /// Verifies the metadata and returns the established identity.
    ///
    /// A failure here short-circuits the call as `Unauthenticated` (or
    /// whatever more specific error the verifier returns).
    fn verify<'a>(
        &'a self,
        metadata: &'a Metadata,
    ) -> BoxFuture<'a, Result<crate::CallerIdentity, CallError>>;
}

/// Records per-call latency and outcome, keyed by method.
pub trait MetricsSink: Send + Sync + 'static {
    /// Records one completed call.
    ///
    /// `outcome` is `"ok"` or a [`CallError::code`] value.
    fn record_call(&self, method: &str, outcome: &str, duration: Duration);
}

/// Derives a cache key from a call.
///
/// Must be a pure function of method + payload: identical inputs yield the
/// identical key, independent of ambient state.
pub trait KeyGenerator: Send + Sync + 'static {
    /// Generates the cache key for `envelope`.
    fn generate(&self, envelope: &CallEnvelope) -> String;
}
