//! Pipeline builder.
//!
//! The builder accumulates a declarative chain configuration and produces
//! exactly one immutable [`Pipeline`](crate::Pipeline), or fails with a
//! [`BuildError`]. Misconfiguration is a returned value, never a panic:
//! wiring mistakes belong to the startup failure domain, not to serving.
//!
//! Insertion order **is** execution order. Calling a `with_*` method twice
//! appends a second instance of that interceptor rather than replacing the
//! first, with one exception: a second metrics registration from a
//! different sink is a conflict.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = PipelineBuilder::new()
//!     .with_recovery()
//!     .with_auth(verifier)
//!     .with_rate_limiter(limiter)
//!     .with_cache(store, key_gen, Duration::from_secs(3600))
//!     .register_fn("Echo", |envelope| async move {
//!         Ok(CallResponse::new(envelope.payload().clone()))
//!     });
//! let pipeline = builder.build()?;
//! ```

use crate::interceptor::{Interceptor, InterceptorKind};
use crate::interceptors::{
    AuthInterceptor, CacheAsideInterceptor, MetricsInterceptor, RateLimitInterceptor,
    RecoveryHandler, RecoveryInterceptor, ValidationInterceptor,
};
use crate::pipeline::Pipeline;
use onager_core::{
    AuthVerifier, BuildError, CacheStore, CallEnvelope, CallResult, Dispatcher, DispatcherRegistry,
    FnDispatcher, KeyGenerator, MetricsSink, RateLimiter,
};
use std::sync::Arc;
use std::time::Duration;

/// Accumulates interceptor configuration and dispatcher registrations, then
/// freezes them into a [`Pipeline`].
///
/// Setup-phase-only: the builder is not meant to be shared across threads
/// while being configured.
pub struct PipelineBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
    registry: DispatcherRegistry,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
    reflection_enabled: bool,
    /// Configuration errors recorded as they happen and surfaced by `build()`.
    deferred_errors: Vec<BuildError>,
    built: bool,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
            registry: DispatcherRegistry::new(),
            metrics_sink: None,
            reflection_enabled: false,
            deferred_errors: Vec::new(),
            built: false,
        }
    }

    /// Appends a metrics interceptor recording through `sink`.
    ///
    /// A second registration with a pointer-distinct sink is a
    /// `ConflictingOptions` build error; the same sink may be registered
    /// again.
    #[must_use]
    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        match &self.metrics_sink {
            Some(existing) if !Arc::ptr_eq(existing, &sink) => {
                self.deferred_errors.push(BuildError::ConflictingOptions(
                    "a different metrics sink is already registered".to_string(),
                ));
            }
            _ => {
                self.metrics_sink = Some(Arc::clone(&sink));
                self.interceptors
                    .push(Arc::new(MetricsInterceptor::new(sink)));
            }
        }
        self
    }

    /// Appends an auth interceptor backed by `verifier`.
    ///
    /// Not calling this at all is a valid configuration: calls then run as
    /// `Anonymous`.
    #[must_use]
    pub fn with_auth(mut self, verifier: Arc<dyn AuthVerifier>) -> Self {
        self.interceptors
            .push(Arc::new(AuthInterceptor::new(verifier)));
        self
    }

    /// Appends a rate-limit interceptor backed by `limiter`.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.interceptors
            .push(Arc::new(RateLimitInterceptor::new(limiter)));
        self
    }

    /// Appends a recovery interceptor with the stock panic→`Internal`
    /// handler.
    ///
    /// Recovery must wrap every interceptor capable of running code that
    /// panics, so `build()` rejects a chain where recovery was appended
    /// after a cache-aside or validation interceptor, or after any
    /// dispatcher was registered.
    #[must_use]
    pub fn with_recovery(self) -> Self {
        self.push_recovery(RecoveryInterceptor::new())
    }

    /// Appends a recovery interceptor converting panics through `handler`.
    ///
    /// Same placement rules as [`with_recovery`](Self::with_recovery).
    #[must_use]
    pub fn with_recovery_handler(self, handler: Arc<dyn RecoveryHandler>) -> Self {
        self.push_recovery(RecoveryInterceptor::with_handler(handler))
    }

    fn push_recovery(mut self, recovery: RecoveryInterceptor) -> Self {
        if !self.registry.is_empty() {
            self.deferred_errors.push(BuildError::InvalidOrdering(
                "recovery must be configured before dispatchers are registered".to_string(),
            ));
            return self;
        }
        self.interceptors.push(Arc::new(recovery));
        self
    }

    /// Appends a cache-aside interceptor.
    ///
    /// `ttl` must be non-zero: a cache that can never serve a hit is a
    /// misconfiguration, rejected rather than silently permitted.
    #[must_use]
    pub fn with_cache(
        mut self,
        store: Arc<dyn CacheStore>,
        key_generator: Arc<dyn KeyGenerator>,
        ttl: Duration,
    ) -> Self {
        if ttl.is_zero() {
            self.deferred_errors.push(BuildError::MissingRequiredOption(
                "cache ttl must be greater than zero".to_string(),
            ));
            return self;
        }
        self.interceptors
            .push(Arc::new(CacheAsideInterceptor::new(store, key_generator, ttl)));
        self
    }

    /// Appends a validation interceptor (structural payload checks, no
    /// external dependency).
    #[must_use]
    pub fn with_validation(mut self) -> Self {
        self.interceptors.push(Arc::new(ValidationInterceptor::new()));
        self
    }

    /// Appends a user-supplied interceptor of kind `Custom`.
    #[must_use]
    pub fn with_interceptor<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Enables service-discovery metadata for the transport layer.
    ///
    /// A pure flag: the execution engine ignores it, the transport reads it
    /// off the built pipeline.
    #[must_use]
    pub fn with_reflection(mut self) -> Self {
        self.reflection_enabled = true;
        self
    }

    /// Registers `dispatcher` for `method`.
    #[must_use]
    pub fn register(mut self, method: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.registry.register(method, dispatcher);
        self
    }

    /// Registers an async function as the dispatcher for `method`.
    #[must_use]
    pub fn register_fn<F, Fut>(self, method: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallEnvelope) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = CallResult> + Send + 'static,
    {
        self.register(method, Arc::new(FnDispatcher::new(func)))
    }

    /// Validates the accumulated configuration and freezes it into an
    /// immutable [`Pipeline`].
    ///
    /// At most one pipeline comes out of a builder: a second call fails
    /// with [`BuildError::AlreadyBuilt`] rather than silently handing back
    /// a stale result.
    pub fn build(&mut self) -> Result<Pipeline, BuildError> {
        if self.built {
            return Err(BuildError::AlreadyBuilt);
        }
        self.built = true;

        if let Some(err) = self.deferred_errors.first() {
            return Err(err.clone());
        }
        self.validate_recovery_placement()?;

        let interceptors = std::mem::take(&mut self.interceptors);
        let registry = std::mem::take(&mut self.registry);

        tracing::info!(
            interceptors = interceptors.len(),
            methods = registry.len(),
            "pipeline frozen"
        );
        Ok(Pipeline::new(interceptors, registry, self.reflection_enabled))
    }

    /// Rejects chains where recovery sits after an interceptor it is
    /// required to wrap.
    fn validate_recovery_placement(&self) -> Result<(), BuildError> {
        let mut wrapped_seen: Option<InterceptorKind> = None;
        for interceptor in &self.interceptors {
            let kind = interceptor.kind();
            if kind.must_follow_recovery() {
                wrapped_seen = Some(kind);
            } else if kind == InterceptorKind::Recovery {
                if let Some(earlier) = wrapped_seen {
                    return Err(BuildError::InvalidOrdering(format!(
                        "recovery must be configured before {earlier}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field(
                "interceptors",
                &self
                    .interceptors
                    .iter()
                    .map(|i| i.name())
                    .collect::<Vec<_>>(),
            )
            .field("methods", &self.registry.len())
            .field("reflection_enabled", &self.reflection_enabled)
            .field("built", &self.built)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onager_core::{
        BoxFuture, CacheEntry, CacheError, CallIdentity, CallResponse, CallerIdentity, Metadata,
    };

    struct NullSink;

    impl MetricsSink for NullSink {
        fn record_call(&self, _method: &str, _outcome: &str, _duration: Duration) {}
    }

    struct NullStore;

    impl CacheStore for NullStore {
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
            Box::pin(async { Ok(()) })
        }
    }

    struct MethodKey;

    impl KeyGenerator for MethodKey {
        fn generate(&self, envelope: &CallEnvelope) -> String {
            envelope.method().to_string()
        }
    }

    struct AllowAll;

    impl AuthVerifier for AllowAll {
        fn verify<'a>(
            &'a self,
            _metadata: &'a Metadata,
        ) -> BoxFuture<'a, Result<CallerIdentity, onager_core::CallError>> {
            Box::pin(async { Ok(CallerIdentity::Anonymous) })
        }
    }

    fn allow_all_limiter() -> Arc<dyn RateLimiter> {
        Arc::new(|_identity: &CallIdentity| true)
    }

    #[test]
    fn empty_builder_builds() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        assert_eq!(pipeline.interceptor_count(), 0);
        assert!(!pipeline.reflection_enabled());
    }

    #[test]
    fn second_build_is_already_built() {
        let mut builder = PipelineBuilder::new();
        assert!(builder.build().is_ok());
        assert_eq!(builder.build().unwrap_err(), BuildError::AlreadyBuilt);
    }

    #[test]
    fn insertion_order_is_frozen_order() {
        let pipeline = PipelineBuilder::new()
            .with_metrics(Arc::new(NullSink))
            .with_recovery()
            .with_validation()
            .build()
            .unwrap();
        assert_eq!(
            pipeline.interceptor_names(),
            vec!["metrics", "recovery", "validation"]
        );
    }

    #[test]
    fn duplicate_kind_appends_second_instance() {
        let pipeline = PipelineBuilder::new()
            .with_validation()
            .with_validation()
            .build()
            .unwrap();
        assert_eq!(pipeline.interceptor_count(), 2);
    }

    #[test]
    fn conflicting_metrics_sinks_rejected() {
        let err = PipelineBuilder::new()
            .with_metrics(Arc::new(NullSink))
            .with_metrics(Arc::new(NullSink))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::ConflictingOptions(_)));
    }

    #[test]
    fn same_metrics_sink_twice_appends() {
        let sink: Arc<dyn MetricsSink> = Arc::new(NullSink);
        let pipeline = PipelineBuilder::new()
            .with_metrics(Arc::clone(&sink))
            .with_metrics(sink)
            .build()
            .unwrap();
        assert_eq!(pipeline.interceptor_count(), 2);
    }

    #[test]
    fn zero_ttl_cache_rejected() {
        let err = PipelineBuilder::new()
            .with_cache(Arc::new(NullStore), Arc::new(MethodKey), Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingRequiredOption(_)));
    }

    #[test]
    fn recovery_after_cache_rejected() {
        let err = PipelineBuilder::new()
            .with_cache(
                Arc::new(NullStore),
                Arc::new(MethodKey),
                Duration::from_secs(60),
            )
            .with_recovery()
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidOrdering(_)));
    }

    #[test]
    fn recovery_after_validation_rejected() {
        let err = PipelineBuilder::new()
            .with_validation()
            .with_recovery()
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidOrdering(_)));
    }

    #[test]
    fn recovery_handler_follows_same_placement_rules() {
        let handler: Arc<dyn RecoveryHandler> = Arc::new(|_payload: &(dyn std::any::Any + Send)| {
            onager_core::CallError::internal("redacted")
        });
        let err = PipelineBuilder::new()
            .with_validation()
            .with_recovery_handler(handler)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidOrdering(_)));
    }

    #[test]
    fn recovery_after_dispatcher_rejected() {
        let err = PipelineBuilder::new()
            .register_fn("Echo", |envelope| async move {
                Ok(CallResponse::new(envelope.payload().clone()))
            })
            .with_recovery()
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidOrdering(_)));
    }

    #[test]
    fn recovery_before_everything_accepted() {
        let pipeline = PipelineBuilder::new()
            .with_recovery()
            .with_auth(Arc::new(AllowAll))
            .with_rate_limiter(allow_all_limiter())
            .with_validation()
            .with_cache(
                Arc::new(NullStore),
                Arc::new(MethodKey),
                Duration::from_secs(60),
            )
            .register_fn("Echo", |envelope| async move {
                Ok(CallResponse::new(envelope.payload().clone()))
            })
            .build()
            .unwrap();
        assert_eq!(pipeline.interceptor_count(), 5);
    }

    #[test]
    fn reflection_is_a_pure_flag() {
        let pipeline = PipelineBuilder::new().with_reflection().build().unwrap();
        assert!(pipeline.reflection_enabled());
        assert_eq!(pipeline.interceptor_count(), 0);
    }
}
