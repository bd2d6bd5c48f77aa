//! Cache errors and lookup outcomes.

use serde::{Deserialize, Serialize};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A header value could not be built from an encoded directive string.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// How the gate answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStatus {
    /// Fresh cache hit.
    Hit,
    /// Stale hit served while a revalidation runs in the background.
    Stale,
    /// Stale hit served in place of a failed origin response.
    StaleIfError,
    /// Served by the origin.
    Miss,
    /// Caching skipped entirely (non-GET request).
    Bypass,
}

impl CacheStatus {
    /// All statuses, in reporting order.
    pub const ALL: [CacheStatus; 5] = [
        Self::Hit,
        Self::Stale,
        Self::StaleIfError,
        Self::Miss,
        Self::Bypass,
    ];

    /// Header representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Stale => "STALE",
            Self::StaleIfError => "STALE-IF-ERROR",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }

    /// Whether the response came from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Hit | Self::Stale | Self::StaleIfError)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
