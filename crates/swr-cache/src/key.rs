//! Cache key derivation.

use http::Request;
use serde::{Deserialize, Serialize};

/// A cache key uniquely identifying a cached response.
///
/// Keys are namespaced by cache name so several logical caches can share
/// one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    key: String,
}

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Derive the key for a request: the cache name plus the full request URI.
    pub fn for_request<B>(cache_name: &str, request: &Request<B>) -> Self {
        Self::new(format!("{}|{}", cache_name, request.uri()))
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}
