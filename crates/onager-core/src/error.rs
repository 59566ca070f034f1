//! Error types for Onager.
//!
//! Two disjoint error domains:
//!
//! - [`BuildError`] is produced only while assembling a pipeline. Every
//!   variant is fatal to startup and can never occur mid-serving.
//! - [`CallError`] is the call-time taxonomy returned from `invoke`.
//!
//! Cache-backend failures are deliberately absent from both: the cache-aside
//! interceptor absorbs them per its degradation policy, and they surface
//! only through logging and metrics.

use thiserror::Error;

/// Result type alias for call outcomes.
pub type CallResult = Result<crate::CallResponse, CallError>;

/// Errors detected while assembling a pipeline.
///
/// Validating composition at build time converts misconfiguration (wrong
/// interceptor order, a cache with no effective TTL) into a startup failure,
/// which is the correct failure domain for infrastructure wiring.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// An option was configured without a required setting.
    #[error("missing required option: {0}")]
    MissingRequiredOption(String),

    /// Two configured options contradict each other.
    #[error("conflicting options: {0}")]
    ConflictingOptions(String),

    /// Interceptors were appended in an order the pipeline cannot honor.
    #[error("invalid interceptor ordering: {0}")]
    InvalidOrdering(String),

    /// `build()` was called a second time on the same builder.
    #[error("pipeline was already built from this builder")]
    AlreadyBuilt,
}

/// Errors returned to the caller of `Pipeline::invoke`.
///
/// Every interceptor either forwards a `CallError` unchanged or replaces it
/// with a more specific one of its own layer; none swallows one silently.
#[derive(Error, Debug)]
pub enum CallError {
    /// Credential verification failed.
    #[error("unauthenticated: {message}")]
    Unauthenticated {
        /// Human-readable failure description.
        message: String,
    },

    /// The caller is over its admission limit.
    #[error("resource exhausted: {message}")]
    ResourceExhausted {
        /// Human-readable failure description.
        message: String,
    },

    /// The payload failed structural validation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable failure description.
        message: String,
    },

    /// No dispatcher is registered for the requested method.
    #[error("method not found: {method}")]
    MethodNotFound {
        /// The unregistered method name.
        method: String,
    },

    /// A recovered panic or an unexpected downstream failure.
    #[error("internal: {message}")]
    Internal {
        /// Human-readable failure description.
        message: String,
        /// The underlying cause, when one exists (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The call's deadline elapsed while waiting on an external capability.
    #[error("deadline exceeded: {message}")]
    DeadlineExceeded {
        /// Human-readable failure description.
        message: String,
    },
}

impl CallError {
    /// Creates an `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a `ResourceExhausted` error.
    #[must_use]
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
        }
    }

    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a `MethodNotFound` error for `method`.
    #[must_use]
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Creates an `Internal` error with no underlying cause.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an `Internal` error wrapping an underlying cause.
    #[must_use]
    pub fn internal_with_source(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a `DeadlineExceeded` error.
    #[must_use]
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            message: message.into(),
        }
    }

    /// Returns the stable code for this error, used as a metrics label.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::Internal { .. } => "internal",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_display() {
        let err = BuildError::InvalidOrdering("recovery after cache".to_string());
        assert_eq!(
            err.to_string(),
            "invalid interceptor ordering: recovery after cache"
        );
        assert_eq!(
            BuildError::AlreadyBuilt.to_string(),
            "pipeline was already built from this builder"
        );
    }

    #[test]
    fn call_error_codes_are_stable() {
        assert_eq!(CallError::unauthenticated("x").code(), "unauthenticated");
        assert_eq!(
            CallError::resource_exhausted("x").code(),
            "resource_exhausted"
        );
        assert_eq!(CallError::invalid_argument("x").code(), "invalid_argument");
        assert_eq!(CallError::method_not_found("x").code(), "method_not_found");
        assert_eq!(CallError::internal("x").code(), "internal");
        assert_eq!(CallError::deadline_exceeded("x").code(), "deadline_exceeded");
    }

    #[test]
    fn internal_error_carries_source() {
        let err = CallError::internal_with_source(
            "store blew up",
            anyhow::anyhow!("connection reset"),
        );
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
    }
}
