//! Middleware configuration.

use serde::{Deserialize, Serialize};

/// Default name of the cache the middleware reads and writes.
pub const DEFAULT_CACHE_NAME: &str = "swr:cache";

/// Configuration for the SWR middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwrConfig {
    /// Whether stored 304 responses may be served from cache.
    ///
    /// When disabled, a cached 304 is treated as if nothing were cached and
    /// the request goes to the origin, so clients never see a 304 they did
    /// not ask for.
    #[serde(default)]
    pub serve_cached_not_modified: bool,
    /// Namespace for cache keys.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,
    /// Add an `x-cache-status` header to every response the gate returns.
    #[serde(default)]
    pub explain_headers: bool,
}

fn default_cache_name() -> String {
    DEFAULT_CACHE_NAME.to_string()
}

impl Default for SwrConfig {
    fn default() -> Self {
        Self {
            serve_cached_not_modified: false,
            cache_name: default_cache_name(),
            explain_headers: false,
        }
    }
}

impl SwrConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow cached 304 responses to be served.
    pub fn with_cached_not_modified(mut self, serve: bool) -> Self {
        self.serve_cached_not_modified = serve;
        self
    }

    /// Set the cache namespace.
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Enable or disable the `x-cache-status` header.
    pub fn with_explain_headers(mut self, enabled: bool) -> Self {
        self.explain_headers = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swr_config_default() {
        let config = SwrConfig::default();

        assert!(!config.serve_cached_not_modified);
        assert_eq!(config.cache_name, "swr:cache");
        assert!(!config.explain_headers);
    }

    #[test]
    fn test_swr_config_builder_chain() {
        let config = SwrConfig::new()
            .with_cached_not_modified(true)
            .with_cache_name("pages")
            .with_explain_headers(true);

        assert!(config.serve_cached_not_modified);
        assert_eq!(config.cache_name, "pages");
        assert!(config.explain_headers);
    }

    #[test]
    fn test_swr_config_empty_toml_uses_defaults() {
        let config: SwrConfig = toml::from_str("").unwrap();
        assert_eq!(config, SwrConfig::default());
    }

    #[test]
    fn test_swr_config_partial_json() {
        let config: SwrConfig =
            serde_json::from_str(r#"{"serve_cached_not_modified": true}"#).unwrap();

        assert!(config.serve_cached_not_modified);
        assert_eq!(config.cache_name, DEFAULT_CACHE_NAME);
    }
}
