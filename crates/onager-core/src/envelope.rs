//! Call envelope and response types.
//!
//! A [`CallEnvelope`] is the transport-agnostic representation of one inbound
//! RPC: a method name, an opaque payload, string metadata, and an optional
//! deadline. How bytes become an envelope is the transport layer's problem;
//! the pipeline only ever sees the envelope.

use bytes::Bytes;
use std::collections::HashMap;
use std::time::Instant;

/// String key/value metadata attached to a call or a response.
///
/// Semantically equivalent to RPC headers/trailers.
pub type Metadata = HashMap<String, String>;

/// Well-known metadata keys used by the built-in interceptors.
pub mod metadata {
    /// Bearer credentials presented by the caller.
    pub const AUTHORIZATION: &str = "authorization";

    /// Declares the payload encoding (e.g. `application/json`).
    pub const CONTENT_TYPE: &str = "content-type";

    /// Cache status marker attached to responses served from cache.
    pub const CACHE_STATUS: &str = "x-cache";

    /// Value of [`CACHE_STATUS`] on a cache hit.
    pub const CACHE_HIT: &str = "hit";
}

/// One inbound call, as seen by the pipeline.
///
/// # Example
///
/// ```
/// use onager_core::CallEnvelope;
///
/// let envelope = CallEnvelope::new("Echo", "hi")
///     .with_metadata("authorization", "Bearer test");
///
/// assert_eq!(envelope.method(), "Echo");
/// assert_eq!(envelope.metadata().get("authorization").unwrap(), "Bearer test");
/// ```
#[derive(Debug, Clone)]
pub struct CallEnvelope {
    /// Fully-qualified method name, e.g. `UserService/GetUser`.
    method: String,

    /// Opaque request payload. The pipeline never interprets it beyond
    /// validation's structural checks.
    payload: Bytes,

    /// Caller-supplied metadata (headers).
    metadata: Metadata,

    /// Absolute deadline for the call, if the caller set one.
    deadline: Option<Instant>,
}

impl CallEnvelope {
    /// Creates an envelope for `method` carrying `payload`.
    #[must_use]
    pub fn new(method: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            method: method.into(),
            payload: payload.into(),
            metadata: Metadata::new(),
            deadline: None,
        }
    }

    /// Attaches a metadata pair, replacing any previous value for the key.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the absolute deadline for the call.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the call metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns the deadline, if one was set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time remaining before the deadline.
    ///
    /// `None` means no deadline was set; `Some(Duration::ZERO)` means the
    /// deadline has already passed.
    #[must_use]
    pub fn time_remaining(&self) -> Option<std::time::Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// The outcome of a successfully dispatched call.
///
/// Interceptors may attach metadata on the way out (a cache-status marker,
/// rate-limit hints) without altering the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    payload: Bytes,
    metadata: Metadata,
}

impl CallResponse {
    /// Creates a response carrying `payload` and no metadata.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            metadata: Metadata::new(),
        }
    }

    /// Returns the response payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the response metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Inserts a metadata pair, replacing any previous value for the key.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Returns `true` if this response carries the cache-hit marker.
    #[must_use]
    pub fn is_cache_hit(&self) -> bool {
        self.metadata
            .get(metadata::CACHE_STATUS)
            .is_some_and(|v| v == metadata::CACHE_HIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn envelope_builder_accumulates_metadata() {
        let envelope = CallEnvelope::new("Echo", "hi")
            .with_metadata("a", "1")
            .with_metadata("b", "2")
            .with_metadata("a", "3");

        assert_eq!(envelope.metadata().len(), 2);
        assert_eq!(envelope.metadata().get("a").unwrap(), "3");
    }

    #[test]
    fn time_remaining_is_none_without_deadline() {
        let envelope = CallEnvelope::new("Echo", "hi");
        assert!(envelope.time_remaining().is_none());
    }

    #[test]
    fn time_remaining_saturates_at_zero() {
        let past = Instant::now() - Duration::from_secs(5);
        let envelope = CallEnvelope::new("Echo", "hi").with_deadline(past);
        assert_eq!(envelope.time_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn cache_hit_marker_round_trips() {
        let mut response = CallResponse::new("hi");
        assert!(!response.is_cache_hit());

        response.insert_metadata(metadata::CACHE_STATUS, metadata::CACHE_HIT);
        assert!(response.is_cache_hit());
    }
}
