//! # Onager Pipeline
//!
//! Interceptor chain builder and execution engine for the Onager RPC
//! pipeline.
//!
//! A pipeline is an ordered chain of cross-cutting behaviors wrapping the
//! dispatch of an incoming call to its handler:
//!
//! ```text
//! invoke → metrics → auth → rate_limit → recovery → validation → cache_aside → Dispatcher
//!                                                                                  ↓
//! result ← metrics ← auth ← rate_limit ← recovery ← validation ← cache_aside ←────┘
//! ```
//!
//! ## Key properties
//!
//! - **Build-time validation**: wrong ordering, conflicting sinks, and a
//!   disabled cache TTL are [`BuildError`](onager_core::BuildError)s from
//!   `build()`, never call-time surprises
//! - **Frozen order**: insertion order is execution order; nothing reorders
//!   the chain after `build()`
//! - **Failure isolation**: the recovery interceptor converts downstream
//!   panics into `Internal` errors
//! - **Best-effort caching**: cache-backend failures degrade to misses and
//!   skipped writes, never to call failures
//!
//! ## Example
//!
//! ```
//! use onager_pipeline::PipelineBuilder;
//! use onager_core::{CallEnvelope, CallResponse};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = PipelineBuilder::new()
//!     .with_recovery()
//!     .with_validation()
//!     .register_fn("Echo", |envelope| async move {
//!         Ok(CallResponse::new(envelope.payload().clone()))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let response = pipeline
//!     .invoke(CallEnvelope::new("Echo", "hi"))
//!     .await
//!     .unwrap();
//! assert_eq!(response.payload().as_ref(), b"hi");
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/onager-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod interceptor;
pub mod interceptors;
mod pipeline;

pub use builder::PipelineBuilder;
pub use interceptor::{FnInterceptor, Interceptor, InterceptorKind, Next};
pub use pipeline::Pipeline;
