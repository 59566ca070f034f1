//! Built-in interceptors.
//!
//! Each interceptor lives in its own module together with any stock
//! adapter it ships with (the sliding-window limiter, the bearer-token
//! verifier, the recorder-backed metrics sink).

pub mod auth;
pub mod cache_aside;
pub mod metrics;
pub mod rate_limit;
pub mod recovery;
pub mod validation;

pub use auth::{AuthInterceptor, BearerTokenVerifier};
pub use cache_aside::CacheAsideInterceptor;
pub use metrics::{MetricsInterceptor, RecorderSink};
pub use rate_limit::{RateLimitInterceptor, SlidingWindowLimiter};
pub use recovery::{panic_message, RecoveryHandler, RecoveryInterceptor};
pub use validation::ValidationInterceptor;
