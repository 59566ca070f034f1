//! Panic isolation.
//!
//! The recovery interceptor wraps its entire downstream in a panic catch:
//! an abnormal termination anywhere further in, including inside the
//! dispatcher, is handed to a [`RecoveryHandler`] and comes back as a
//! [`CallError`]. The panic never propagates out of `invoke`.
//!
//! The stock handler converts every panic into [`CallError::Internal`]
//! carrying the recovered diagnostic message; integrators that need to
//! redact messages or classify panics differently plug in their own
//! handler.
//!
//! Errors returned cleanly are not touched; recovery converts crashes, it
//! does not suppress errors.

use crate::interceptor::{Interceptor, InterceptorKind, Next};
use futures_util::FutureExt;
use onager_core::{BoxFuture, CallContext, CallEnvelope, CallError, CallResult};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Converts a recovered panic payload into the error returned to the
/// caller.
///
/// Handlers must not panic themselves; a panicking handler escapes the
/// catch and aborts the call the interceptor was trying to save.
pub trait RecoveryHandler: Send + Sync + 'static {
    /// Maps the panic payload to a call-time error.
    fn handle(&self, payload: &(dyn Any + Send)) -> CallError;
}

impl<F> RecoveryHandler for F
where
    F: Fn(&(dyn Any + Send)) -> CallError + Send + Sync + 'static,
{
    fn handle(&self, payload: &(dyn Any + Send)) -> CallError {
        self(payload)
    }
}

/// Extracts a printable message from a panic payload.
///
/// Useful to custom [`RecoveryHandler`]s that want the diagnostic text
/// without re-implementing the downcast dance.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn default_handler(payload: &(dyn Any + Send)) -> CallError {
    CallError::internal(format!("panic triggered: {}", panic_message(payload)))
}

/// Converts downstream panics into [`CallError`]s via a [`RecoveryHandler`].
#[derive(Clone)]
pub struct RecoveryInterceptor {
    handler: Arc<dyn RecoveryHandler>,
}

impl RecoveryInterceptor {
    /// Creates a recovery interceptor with the stock panic→`Internal`
    /// handler.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handler(Arc::new(default_handler))
    }

    /// Creates a recovery interceptor converting panics through `handler`.
    #[must_use]
    pub fn with_handler(handler: Arc<dyn RecoveryHandler>) -> Self {
        Self { handler }
    }
}

impl Default for RecoveryInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecoveryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryInterceptor").finish_non_exhaustive()
    }
}

impl Interceptor for RecoveryInterceptor {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Recovery
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        Box::pin(async move {
            let method = envelope.method().to_string();
            match AssertUnwindSafe(next.run(ctx, envelope)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let err = self.handler.handle(payload.as_ref());
                    tracing::error!(
                        method = %method,
                        panic = %panic_message(payload.as_ref()),
                        error = %err,
                        "recovered downstream panic"
                    );
                    Err(err)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onager_core::CallResponse;

    async fn run(recovery: RecoveryInterceptor, next_panics: bool) -> CallResult {
        let mut ctx = CallContext::new("Echo");
        let next = Next::dispatch(move |_ctx, envelope| {
            Box::pin(async move {
                assert!(!next_panics, "dispatcher exploded");
                Ok(CallResponse::new(envelope.payload().clone()))
            })
        });
        recovery
            .process(&mut ctx, CallEnvelope::new("Echo", "hi"), next)
            .await
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let err = run(RecoveryInterceptor::new(), true).await.unwrap_err();
        match err {
            CallError::Internal { message, .. } => {
                assert!(message.starts_with("panic triggered:"), "{message}");
            }
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn custom_handler_shapes_the_error() {
        let redacting: Arc<dyn RecoveryHandler> =
            Arc::new(|_payload: &(dyn Any + Send)| CallError::internal("handler crashed"));
        let recovery = RecoveryInterceptor::with_handler(redacting);

        let err = run(recovery, true).await.unwrap_err();
        match err {
            CallError::Internal { message, .. } => {
                assert_eq!(message, "handler crashed");
            }
            other => panic!("expected Internal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_success_passes_through() {
        let response = run(RecoveryInterceptor::new(), false).await.unwrap();
        assert_eq!(response.payload().as_ref(), b"hi");
    }

    #[tokio::test]
    async fn clean_error_passes_through_unchanged() {
        let recovery = RecoveryInterceptor::new();
        let mut ctx = CallContext::new("Echo");
        let next = Next::dispatch(|_ctx, _envelope| {
            Box::pin(async { Err(CallError::invalid_argument("bad payload")) })
        });

        let err = recovery
            .process(&mut ctx, CallEnvelope::new("Echo", "hi"), next)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::InvalidArgument { .. }));
    }

    #[test]
    fn panic_message_formats() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
