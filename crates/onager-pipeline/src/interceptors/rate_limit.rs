//! Admission control.
//!
//! Before invoking its continuation, the rate-limit interceptor derives the
//! call identity (caller key + method) and asks the configured
//! [`RateLimiter`] whether the call is admitted. A denial short-circuits
//! immediately with [`CallError::ResourceExhausted`]: downstream work,
//! including caching and the dispatcher, is never charged for a rejected
//! call.
//!
//! The stock [`SlidingWindowLimiter`] tracks request counts in time windows
//! and weights the previous window by how much of the current window has
//! elapsed, which is more accurate than a fixed window at the boundary.

use crate::interceptor::{Interceptor, InterceptorKind, Next};
use onager_core::{
    BoxFuture, CallContext, CallEnvelope, CallError, CallIdentity, CallResult, RateLimiter,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rejects calls over the admission limit.
pub struct RateLimitInterceptor {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitInterceptor {
    /// Creates a rate-limit interceptor backed by `limiter`.
    #[must_use]
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Interceptor for RateLimitInterceptor {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::RateLimit
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        Box::pin(async move {
            let identity = CallIdentity::new(ctx.identity().key(), envelope.method());
            if self.limiter.allow(&identity) {
                next.run(ctx, envelope).await
            } else {
                tracing::debug!(identity = %identity, "call rejected by rate limiter");
                Err(CallError::resource_exhausted(format!(
                    "{identity} is over its admission limit"
                )))
            }
        })
    }
}

/// Per-identity window state.
#[derive(Debug, Clone)]
struct WindowData {
    count: u64,
    window_start: Instant,
    prev_count: u64,
}

/// A shared in-memory sliding-window limiter keyed by call identity.
///
/// State outlives individual calls and is shared across all concurrent
/// calls; the interior mutex makes it externally synchronized as the
/// pipeline expects.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: u64,
    window: Duration,
    windows: Mutex<HashMap<CallIdentity, WindowData>>,
}

impl SlidingWindowLimiter {
    /// Creates a limiter admitting `limit` calls per identity per `window`.
    #[must_use]
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Sliding-window admission check, incrementing on admit.
    fn check(&self, identity: &CallIdentity, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let data = windows
            .entry(identity.clone())
            .or_insert_with(|| WindowData {
                count: 0,
                window_start: now,
                prev_count: 0,
            });

        let elapsed = now.duration_since(data.window_start);
        if elapsed >= self.window {
            let windows_passed = elapsed.as_secs_f64() / self.window.as_secs_f64();
            data.prev_count = if windows_passed >= 2.0 { 0 } else { data.count };
            data.count = 0;
            data.window_start = now;
        }

        // Weight the previous window by the unelapsed share of the current one.
        let progress = now.duration_since(data.window_start).as_secs_f64()
            / self.window.as_secs_f64();
        let prev_weight = 1.0 - progress;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let weighted = data.count + (data.prev_count as f64 * prev_weight) as u64;

        if weighted >= self.limit {
            false
        } else {
            data.count += 1;
            true
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, identity: &CallIdentity) -> bool {
        self.check(identity, Instant::now())
    }
}
