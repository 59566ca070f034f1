//! Structural payload validation.
//!
//! Checks the envelope's shape without consulting any stored state: the
//! payload must be non-empty, and when the metadata declares a JSON
//! content type the payload must parse as JSON. Failures short-circuit
//! with [`CallError::InvalidArgument`] before downstream interceptors run.

use crate::interceptor::{Interceptor, InterceptorKind, Next};
use onager_core::{metadata, BoxFuture, CallContext, CallEnvelope, CallError, CallResult};

/// Structural payload checks with no external dependency.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationInterceptor;

impl ValidationInterceptor {
    /// Creates a validation interceptor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn check(envelope: &CallEnvelope) -> Result<(), CallError> {
        if envelope.payload().is_empty() {
            return Err(CallError::invalid_argument("payload must not be empty"));
        }

        let declares_json = envelope
            .metadata()
            .get(metadata::CONTENT_TYPE)
            .is_some_and(|ct| ct.contains("json"));
        if declares_json {
            serde_json::from_slice::<serde_json::Value>(envelope.payload()).map_err(|err| {
                CallError::invalid_argument(format!("payload is not well-formed JSON: {err}"))
            })?;
        }

        Ok(())
    }
}

impl Interceptor for ValidationInterceptor {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Validation
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        Box::pin(async move {
            if let Err(err) = Self::check(&envelope) {
                tracing::debug!(method = %envelope.method(), error = %err, "payload rejected");
                return Err(err);
            }
            next.run(ctx, envelope).await
        })
    }
}
