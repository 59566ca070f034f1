//! Core interceptor trait and continuation types.
//!
//! An interceptor is a named, ordered behavior wrapping a downstream call.
//! It receives the mutable per-call context, the envelope, and a [`Next`]
//! continuation; it either runs the continuation exactly once or
//! short-circuits with its own result.
//!
//! # Invariants
//!
//! - An interceptor MUST call `next.run()` at most once ([`Next`] is
//!   consumed by value to enforce this)
//! - An interceptor either forwards an error unchanged or replaces it with
//!   a more specific one of its own layer; it never drops one
//! - An interceptor MUST NOT reorder itself or others; the sequence
//!   observed at call time is exactly the sequence fixed at build time

use onager_core::{BoxFuture, CallContext, CallEnvelope, CallResult};

/// The closed set of interceptor kinds a pipeline can carry.
///
/// Kinds exist so that ordering constraints (recovery placement) can be
/// validated structurally at build time instead of by runtime type
/// inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorKind {
    /// Records per-call latency and outcome.
    Metrics,
    /// Verifies caller credentials.
    Auth,
    /// Enforces admission limits per call identity.
    RateLimit,
    /// Converts downstream panics into `Internal` errors.
    Recovery,
    /// Read-through/write-through response caching.
    CacheAside,
    /// Structural payload checks.
    Validation,
    /// A user-supplied behavior the pipeline knows nothing about.
    Custom,
}

impl InterceptorKind {
    /// Returns `true` for kinds that run user or downstream code which may
    /// panic, and therefore must sit inside any recovery interceptor.
    #[must_use]
    pub const fn must_follow_recovery(self) -> bool {
        matches!(self, Self::CacheAside | Self::Validation)
    }

    /// Returns the kind's stable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::Recovery => "recovery",
            Self::CacheAside => "cache_aside",
            Self::Validation => "validation",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for InterceptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A composable unit wrapping a call with a cross-cutting behavior.
pub trait Interceptor: Send + Sync + 'static {
    /// Returns the unique name of this interceptor, used for logging and
    /// trace assertions.
    fn name(&self) -> &'static str;

    /// Returns the kind, used by the builder's ordering validation.
    fn kind(&self) -> InterceptorKind;

    /// Processes the call through this interceptor.
    ///
    /// Runs `next` to proceed downstream, or returns without running it to
    /// short-circuit.
    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult>;
}

/// The continuation handed to each interceptor.
///
/// Consumed by value so it can be run at most once per call.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        interceptor: &'a dyn Interceptor,
        next: Box<Next<'a>>,
    },
    Dispatch(
        Box<dyn FnOnce(&mut CallContext, CallEnvelope) -> BoxFuture<'static, CallResult> + Send + 'a>,
    ),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will run `interceptor`, continuing with `next`.
    pub(crate) fn new(interceptor: &'a dyn Interceptor, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                interceptor,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal `Next` that invokes the dispatcher.
    pub(crate) fn dispatch<F>(f: F) -> Self
    where
        F: FnOnce(&mut CallContext, CallEnvelope) -> BoxFuture<'static, CallResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Dispatch(Box::new(f)),
        }
    }

    /// Runs the next interceptor or the dispatcher.
    pub async fn run(self, ctx: &mut CallContext, envelope: CallEnvelope) -> CallResult {
        match self.inner {
            NextInner::Chain { interceptor, next } => {
                interceptor.process(ctx, envelope, *next).await
            }
            NextInner::Dispatch(dispatch) => dispatch(ctx, envelope).await,
        }
    }
}

/// An interceptor built from an async function.
///
/// This is the `Custom` escape hatch: a behavior the pipeline carries in
/// order but otherwise knows nothing about.
///
/// # Example
///
/// ```ignore
/// let timing = FnInterceptor::new("timing", |ctx, envelope, next| async move {
///     let start = std::time::Instant::now();
///     let result = next.run(ctx, envelope).await;
///     tracing::debug!(elapsed = ?start.elapsed(), "call finished");
///     result
/// });
/// ```
pub struct FnInterceptor<F> {
    name: &'static str,
    func: F,
}

impl<F> FnInterceptor<F>
where
    F: for<'a> Fn(&'a mut CallContext, CallEnvelope, Next<'a>) -> BoxFuture<'a, CallResult>
        + Send
        + Sync
        + 'static,
{
    /// Creates a custom interceptor named `name`.
    ///
    /// The bound is spelled here so closure signatures are inferred against
    /// it at the call site.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: for<'a> Fn(&'a mut CallContext, CallEnvelope, Next<'a>) -> BoxFuture<'a, CallResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Custom
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        (self.func)(ctx, envelope, next)
    }
}
