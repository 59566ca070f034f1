//! # Onager Cache
//!
//! Concrete cache adapters for the Onager RPC pipeline:
//!
//! - [`MemoryCache`] - a shared in-memory TTL store on a concurrent map
//! - [`DigestKeyGenerator`] - a pure method+payload digest key generator
//!
//! Both plug into the pipeline through the `CacheStore` and `KeyGenerator`
//! capability traits; a networked store (Redis and friends) slots into the
//! same seams.

#![doc(html_root_url = "https://docs.rs/onager-cache/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod key;
mod memory;

pub use key::DigestKeyGenerator;
pub use memory::MemoryCache;
