//! # Onager
//!
//! **A configurable request-processing pipeline for RPC servers**
//!
//! Onager wraps the dispatch of an incoming call in an ordered chain of
//! cross-cutting behaviors: observability, authentication, rate limiting,
//! panic isolation, response caching, and input validation. The chain is
//! validated and frozen at build time and re-run per call:
//!
//! ```text
//! invoke → metrics → auth → rate_limit → recovery → ... → Dispatcher
//!                                                             ↓
//! result ←──────────── same chain, reverse order ←────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```
//! use onager::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = PipelineBuilder::new()
//!     .with_recovery()
//!     .with_cache(
//!         Arc::new(MemoryCache::new()),
//!         Arc::new(DigestKeyGenerator::new()),
//!         Duration::from_secs(3600),
//!     )
//!     .register_fn("Echo", |envelope| async move {
//!         Ok(CallResponse::new(envelope.payload().clone()))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let response = pipeline.invoke(CallEnvelope::new("Echo", "hi")).await.unwrap();
//! assert_eq!(response.payload().as_ref(), b"hi");
//! # }
//! ```
//!
//! Transport framing, credential verification, and persistence backends
//! are external collaborators behind the capability traits in
//! [`onager_core`]; this workspace ships in-memory adapters for all of
//! them.

#![doc(html_root_url = "https://docs.rs/onager/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use onager_core as core;

// Re-export the pipeline
pub use onager_pipeline as pipeline;

// Re-export cache adapters
pub use onager_cache as cache;

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use onager_cache::{DigestKeyGenerator, MemoryCache};
    pub use onager_core::{
        BuildError, CallEnvelope, CallError, CallResponse, CallResult, CallerIdentity,
    };
    pub use onager_pipeline::interceptors::{
        BearerTokenVerifier, RecorderSink, SlidingWindowLimiter,
    };
    pub use onager_pipeline::{Pipeline, PipelineBuilder};
}
