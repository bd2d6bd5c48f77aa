//! CLI configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use swr::swr_core::SwrConfig;
use swr::swr_observability::LoggingConfig;

/// File names searched for, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["swr.toml", ".swr.toml", "swr.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Middleware configuration.
    #[serde(default)]
    pub swr: SwrConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(path, &content)
    }

    /// Parse config content, as JSON when `path` ends in `.json`.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(content).with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }
}

/// Generate a default swr.toml config file.
pub fn generate_default_config() -> String {
    let defaults = SwrConfig::default();
    format!(
        r#"# SWR middleware configuration

[swr]
# Serve stored 304 Not Modified responses from cache.
serve_cached_not_modified = {serve}
# Namespace for cache keys.
cache_name = "{name}"
# Add x-cache-status to every response.
explain_headers = {explain}

[logging]
# trace, debug, info, warn or error. RUST_LOG takes precedence.
level = "info"
# human or json
format = "human"
"#,
        serve = defaults.serve_cached_not_modified,
        name = defaults.cache_name,
        explain = defaults.explain_headers,
    )
}
