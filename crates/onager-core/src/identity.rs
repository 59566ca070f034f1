//! Caller identity types.

use serde::{Deserialize, Serialize};

/// The authenticated identity of a caller, established by the auth
/// interceptor and carried on the call context.
///
/// With no auth interceptor configured every call runs as
/// [`CallerIdentity::Anonymous`]; that is an explicit design choice, not a
/// default-deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// No credentials were presented or no auth is configured.
    Anonymous,

    /// A bearer-token subject.
    Token {
        /// The subject the token was issued to.
        subject: String,
    },

    /// An identity scheme the built-in verifiers know nothing about.
    Custom(String),
}

impl CallerIdentity {
    /// Returns the stable key for this identity, used to scope admission
    /// decisions.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Token { subject } => subject,
            Self::Custom(id) => id,
        }
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The caller/method combination a rate limiter scopes admission by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallIdentity {
    /// Stable key of the caller identity.
    pub caller: String,
    /// The method being invoked.
    pub method: String,
}

impl CallIdentity {
    /// Creates a call identity for `caller` invoking `method`.
    #[must_use]
    pub fn new(caller: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            method: method.into(),
        }
    }
}

impl std::fmt::Display for CallIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.caller, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_keys() {
        assert_eq!(CallerIdentity::Anonymous.key(), "anonymous");
        assert_eq!(
            CallerIdentity::Token {
                subject: "alice".to_string()
            }
            .key(),
            "alice"
        );
        assert_eq!(CallerIdentity::Custom("svc-a".to_string()).key(), "svc-a");
    }

    #[test]
    fn call_identity_display() {
        let id = CallIdentity::new("alice", "Echo");
        assert_eq!(id.to_string(), "alice/Echo");
    }
}
