//! Credential verification.
//!
//! The auth interceptor hands the call metadata to an external
//! [`AuthVerifier`]. A verification failure short-circuits with
//! [`CallError::Unauthenticated`] before downstream interceptors run; a
//! success sets the caller identity on the call context for everyone
//! further in (the rate limiter keys admission by it).
//!
//! The verifier is an external capability, so it runs under the envelope's
//! deadline: a verifier that outlives the deadline fails the call with
//! `DeadlineExceeded` rather than hanging it.

use crate::interceptor::{Interceptor, InterceptorKind, Next};
use onager_core::{
    metadata, AuthVerifier, BoxFuture, CallContext, CallEnvelope, CallError, CallResult,
    CallerIdentity, Metadata,
};
use std::sync::Arc;

/// Rejects unauthenticated calls.
pub struct AuthInterceptor {
    verifier: Arc<dyn AuthVerifier>,
}

impl AuthInterceptor {
    /// Creates an auth interceptor backed by `verifier`.
    #[must_use]
    pub fn new(verifier: Arc<dyn AuthVerifier>) -> Self {
        Self { verifier }
    }
}

impl Interceptor for AuthInterceptor {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn kind(&self) -> InterceptorKind {
        InterceptorKind::Auth
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut CallContext,
        envelope: CallEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, CallResult> {
        Box::pin(async move {
            let verified = {
                let fut = self.verifier.verify(envelope.metadata());
                match envelope.time_remaining() {
                    Some(remaining) => match tokio::time::timeout(remaining, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(CallError::deadline_exceeded(
                            "credential verification outlived the call deadline",
                        )),
                    },
                    None => fut.await,
                }
            };

            match verified {
                Ok(identity) => {
                    tracing::debug!(caller = %identity, method = %envelope.method(), "caller verified");
                    ctx.set_identity(identity);
                    next.run(ctx, envelope).await
                }
                Err(err) => {
                    tracing::debug!(method = %envelope.method(), error = %err, "verification failed");
                    Err(err)
                }
            }
        })
    }
}

/// A stock verifier comparing a `Bearer` token from the `authorization`
/// metadata against one expected value.
///
/// Intended for tests and local development; production callers plug in a
/// real OAuth/OIDC verifier behind [`AuthVerifier`].
#[derive(Debug, Clone)]
pub struct BearerTokenVerifier {
    token: String,
    subject: String,
}

impl BearerTokenVerifier {
    /// Creates a verifier accepting exactly `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            subject: "bearer".to_string(),
        }
    }

    /// Sets the subject reported for verified callers.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    fn token_from(metadata: &Metadata) -> Result<&str, CallError> {
        let value = metadata
            .get(metadata::AUTHORIZATION)
            .ok_or_else(|| CallError::unauthenticated("missing authorization metadata"))?;
        value
            .strip_prefix("Bearer ")
            .ok_or_else(|| CallError::unauthenticated("authorization scheme must be Bearer"))
    }
}

impl AuthVerifier for BearerTokenVerifier {
    fn verify<'a>(
        &'a self,
        metadata: &'a Metadata,
    ) -> BoxFuture<'a, Result<CallerIdentity, CallError>> {
        Box::pin(async move {
            let token = Self::token_from(metadata)?;
            if token != self.token {
                return Err(CallError::unauthenticated("invalid auth token"));
            }
            Ok(CallerIdentity::Token {
                subject: self.subject.clone(),
            })
        })
    }
}
