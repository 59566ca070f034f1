//! Cache key generation.

use onager_core::{CallEnvelope, KeyGenerator};
use sha1::{Digest, Sha1};

/// Derives cache keys as `{namespace}:{method}:{hex digest of payload}`.
///
/// Pure in method + payload: identical inputs always yield the identical
/// key, regardless of metadata, deadline, or ambient state. The digest
/// keeps keys bounded even for large payloads, which matters for
/// length-limited backends.
#[derive(Debug, Clone)]
pub struct DigestKeyGenerator {
    namespace: String,
}

impl DigestKeyGenerator {
    /// Creates a generator with the default `onager` namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::with_namespace("onager")
    }

    /// Creates a generator prefixing keys with `namespace`, for backends
    /// shared between applications.
    #[must_use]
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for DigestKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for DigestKeyGenerator {
    fn generate(&self, envelope: &CallEnvelope) -> String {
        use std::fmt::Write as _;

        let mut hasher = Sha1::new();
        hasher.update(envelope.payload());
        let digest = hasher.finalize();

        let mut key = format!("{}:{}:", self.namespace, envelope.method());
        for byte in digest {
            // Writing to a String is infallible.
            let _ = write!(key, "{byte:02x}");
        }
        key
    }
}
