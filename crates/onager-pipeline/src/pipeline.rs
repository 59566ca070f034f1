//! The frozen pipeline and its execution engine.
//!
//! A [`Pipeline`] is created once per server process (or per hot-reload
//! epoch) and reused for the process lifetime. It is immutable and safe for
//! unlimited concurrent [`invoke`](Pipeline::invoke) calls: interceptor
//! state is shared behind `Arc`s, while the context is created per call.

use crate::interceptor::{Interceptor, Next};
use onager_core::{CallContext, CallEnvelope, CallError, CallResult, DispatcherRegistry};
use std::sync::Arc;

/// The frozen, concurrency-safe interceptor chain.
///
/// The sequence observed at call time is exactly the sequence fixed at
/// build time; nothing can reorder it afterwards.
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    registry: DispatcherRegistry,
    reflection_enabled: bool,
}

impl Pipeline {
    pub(crate) fn new(
        interceptors: Vec<Arc<dyn Interceptor>>,
        registry: DispatcherRegistry,
        reflection_enabled: bool,
    ) -> Self {
        Self {
            interceptors,
            registry,
            reflection_enabled,
        }
    }

    /// Runs one call through the chain.
    ///
    /// Routing happens exactly once, before any interceptor sees the call:
    /// an unregistered method fails with [`CallError::MethodNotFound`]
    /// immediately. Interceptors then execute outermost-first on the way
    /// in, and observe the outcome in reverse on the way out.
    pub async fn invoke(&self, envelope: CallEnvelope) -> CallResult {
        let Some(dispatcher) = self.registry.resolve(envelope.method()) else {
            tracing::debug!(method = %envelope.method(), "no dispatcher registered");
            return Err(CallError::method_not_found(envelope.method()));
        };

        let mut ctx = CallContext::new(envelope.method());
        tracing::debug!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            "call admitted to pipeline"
        );

        let mut next = Next::dispatch(move |_ctx, envelope| dispatcher.dispatch(envelope));
        for interceptor in self.interceptors.iter().rev() {
            next = Next::new(interceptor.as_ref(), next);
        }
        next.run(&mut ctx, envelope).await
    }

    /// Returns the interceptor names in execution order.
    #[must_use]
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Returns the number of interceptors in the chain.
    #[must_use]
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if the transport layer should expose service
    /// discovery metadata for this pipeline.
    #[must_use]
    pub fn reflection_enabled(&self) -> bool {
        self.reflection_enabled
    }

    /// Returns the registered method names, unordered.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.registry.methods()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("interceptors", &self.interceptor_names())
            .field("methods", &self.registry.len())
            .field("reflection_enabled", &self.reflection_enabled)
            .finish()
    }
}
