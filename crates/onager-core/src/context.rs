//! Per-call context.
//!
//! A [`CallContext`] is created for every `invoke` and flows mutably through
//! the interceptor chain. Interceptors enrich it (the auth interceptor sets
//! the caller identity); it never outlives the call.

use crate::CallerIdentity;
use std::time::Instant;
use uuid::Uuid;

/// Unique identifier for a single call.
///
/// Backed by UUID v7, so IDs are time-ordered and safe to generate
/// concurrently without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable per-call state threaded through the interceptor chain.
#[derive(Debug)]
pub struct CallContext {
    request_id: RequestId,
    method: String,
    identity: CallerIdentity,
    started_at: Instant,
}

impl CallContext {
    /// Creates a context for a call to `method` with a fresh request ID.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method: method.into(),
            identity: CallerIdentity::Anonymous,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the method being invoked.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Sets the caller identity.
    ///
    /// Called by the auth interceptor after successful verification.
    pub fn set_identity(&mut self, identity: CallerIdentity) {
        self.identity = identity;
    }

    /// Returns when the call started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the call started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
