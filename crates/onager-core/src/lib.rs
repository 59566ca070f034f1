//! # Onager Core
//!
//! Core types and capability traits for the Onager RPC pipeline.
//!
//! This crate provides the foundational types used throughout Onager:
//!
//! - [`CallEnvelope`] / [`CallResponse`] - The unit of work flowing through a pipeline
//! - [`CallContext`] - Per-call context carrying the request ID and caller identity
//! - [`CallError`] / [`BuildError`] - The call-time and build-time error taxonomies
//! - [`DispatcherRegistry`] - Method-name to handler routing, resolved once per call
//! - Capability traits ([`CacheStore`], [`RateLimiter`], [`AuthVerifier`],
//!   [`MetricsSink`], [`KeyGenerator`]) consumed by the pipeline as pluggable
//!   collaborators

#![doc(html_root_url = "https://docs.rs/onager-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod capability;
mod context;
mod dispatch;
mod envelope;
mod error;
mod identity;

pub use capability::{
    AuthVerifier, CacheEntry, CacheError, CacheStore, KeyGenerator, MetricsSink, RateLimiter,
};
pub use context::{CallContext, RequestId};
pub use dispatch::{Dispatcher, DispatcherRegistry, FnDispatcher};
pub use envelope::{metadata, CallEnvelope, CallResponse, Metadata};
pub use error::{BuildError, CallError, CallResult};
pub use identity::{CallIdentity, CallerIdentity};

/// A boxed future returned by async capability and interceptor methods.
///
/// Onager uses manual future boxing rather than an `async_trait` proc macro
/// so that trait objects stay explicit about their lifetimes.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
