//! Stale-if-error fallback for failed origin calls.

use swr_cache::{CacheEntry, Verdict};
use swr_core::OriginResult;

/// Whether an origin result counts as a failure.
///
/// Both a failed call and a 5xx response are failures; 4xx responses are the
/// origin's answer and are passed through.
pub fn is_origin_failure(result: &OriginResult) -> bool {
    match result {
        Ok(response) => response.status().is_server_error(),
        Err(_) => true,
    }
}

/// Result of applying the fallback.
#[derive(Debug)]
pub enum FallbackResult {
    /// Use what the origin returned.
    Origin(OriginResult),
    /// Serve the stale entry in place of a failed origin result.
    Stale {
        /// The stored entry, still in its stored encoding.
        entry: CacheEntry,
        /// Why the origin result was discarded.
        cause: String,
    },
}

impl FallbackResult {
    /// Whether the stale entry replaced the origin result.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Replace a failed origin result with the stale entry when the entry is
/// still inside its stale-if-error window.
///
/// Anything else, successful or not, is returned unchanged.
pub fn apply_fallback(
    result: OriginResult,
    stale: Option<CacheEntry>,
    verdict: &Verdict,
) -> FallbackResult {
    if !verdict.should_override_error() || !is_origin_failure(&result) {
        return FallbackResult::Origin(result);
    }
    let Some(entry) = stale else {
        return FallbackResult::Origin(result);
    };

    let cause = match &result {
        Ok(response) => format!("origin returned {}", response.status()),
        Err(err) => err.to_string(),
    };
    FallbackResult::Stale { entry, cause }
}
