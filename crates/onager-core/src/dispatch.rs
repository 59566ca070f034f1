//! Dispatcher registry.
//!
//! A [`Dispatcher`] is the business handler at the innermost end of the
//! interceptor chain. The pipeline resolves a method name against the
//! [`DispatcherRegistry`] exactly once per call, before any interceptor
//! runs; interceptors never re-route.

use crate::{BoxFuture, CallEnvelope, CallResult};
use std::collections::HashMap;
use std::sync::Arc;

/// A registered business handler for one method.
pub trait Dispatcher: Send + Sync + 'static {
    /// Handles the call and produces a response or a call-time error.
    fn dispatch(&self, envelope: CallEnvelope) -> BoxFuture<'static, CallResult>;
}

/// A dispatcher built from an async function or closure.
///
/// # Example
///
/// ```
/// use onager_core::{CallEnvelope, CallResponse, CallResult, FnDispatcher};
///
/// let echo = FnDispatcher::new(|envelope: CallEnvelope| async move {
///     CallResult::Ok(CallResponse::new(envelope.payload().clone()))
/// });
/// # let _ = echo;
/// ```
pub struct FnDispatcher<F> {
    func: F,
}

impl<F> FnDispatcher<F> {
    /// Wraps `func` as a [`Dispatcher`].
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Dispatcher for FnDispatcher<F>
where
    F: Fn(CallEnvelope) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = CallResult> + Send + 'static,
{
    fn dispatch(&self, envelope: CallEnvelope) -> BoxFuture<'static, CallResult> {
        Box::pin((self.func)(envelope))
    }
}

/// Maps method names to their dispatchers.
///
/// Populated during pipeline construction and immutable afterwards. A later
/// registration for the same method replaces the earlier one, matching the
/// usual RPC-server registration semantics.
#[derive(Default, Clone)]
pub struct DispatcherRegistry {
    handlers: HashMap<String, Arc<dyn Dispatcher>>,
}

impl DispatcherRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dispatcher` for `method`.
    pub fn register(&mut self, method: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) {
        let method = method.into();
        tracing::debug!(method = %method, "dispatcher registered");
        self.handlers.insert(method, dispatcher);
    }

    /// Resolves the dispatcher for `method`, if one is registered.
    #[must_use]
    pub fn resolve(&self, method: &str) -> Option<Arc<dyn Dispatcher>> {
        self.handlers.get(method).cloned()
    }

    /// Returns the number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the registered method names, unordered.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for DispatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}
