//! Cache-entry header encoding.
//!
//! A max-age-only store evicts an entry once its age passes `max-age`, which
//! would drop it before any stale window could be used. Before storing, the
//! `max-age` directive is raised by the longest stale window and the
//! `stale-while-revalidate` / `stale-if-error` values move into metadata
//! headers. Reading an entry back reverses the transformation.
//!
//! ```text
//! origin:  Cache-Control: max-age=10, stale-while-revalidate=5, stale-if-error=3
//! stored:  Cache-Control: max-age=15
//!          x-workers-swr-metadata-stale-while-revalidate: 5
//!          x-workers-swr-metadata-stale-if-error: 3
//! ```

use http::header::{HeaderMap, HeaderName, HeaderValue, AGE, CACHE_CONTROL};

use crate::directives::{
    parse_leading_int, Directives, MAX_AGE, STALE_IF_ERROR, STALE_WHILE_REVALIDATE,
};
use crate::error::{CacheResult, CacheStatus};
use crate::policy::CachingValues;

/// Header names used by the middleware.
pub mod header_names {
    /// Stored `stale-while-revalidate` value.
    pub const SWR_METADATA: &str = "x-workers-swr-metadata-stale-while-revalidate";
    /// Stored `stale-if-error` value.
    pub const SIE_METADATA: &str = "x-workers-swr-metadata-stale-if-error";
    /// Cache status header (HIT, STALE, STALE-IF-ERROR, MISS, BYPASS).
    pub const X_CACHE_STATUS: &str = "x-cache-status";
}

/// Headers to overlay on a response before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeaders {
    /// Rewritten `Cache-Control` value.
    pub cache_control: String,
    /// Original `stale-while-revalidate`, if it was present (including zero).
    pub stale_while_revalidate: Option<u64>,
    /// Original `stale-if-error`, if it was present (including zero).
    pub stale_if_error: Option<u64>,
}

impl StoreHeaders {
    /// Overlay these headers on a header map.
    ///
    /// Metadata headers not produced by the encoding are removed so an origin
    /// cannot smuggle its own values into the store.
    pub fn apply(&self, headers: &mut HeaderMap) -> CacheResult<()> {
        headers.insert(CACHE_CONTROL, HeaderValue::from_str(&self.cache_control)?);
        set_metadata(headers, header_names::SWR_METADATA, self.stale_while_revalidate);
        set_metadata(headers, header_names::SIE_METADATA, self.stale_if_error);
        Ok(())
    }

    /// The headers as `(name, value)` pairs.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("cache-control".to_string(), self.cache_control.clone())];
        if let Some(swr) = self.stale_while_revalidate {
            pairs.push((header_names::SWR_METADATA.to_string(), swr.to_string()));
        }
        if let Some(sie) = self.stale_if_error {
            pairs.push((header_names::SIE_METADATA.to_string(), sie.to_string()));
        }
        pairs
    }
}

fn set_metadata(headers: &mut HeaderMap, name: &'static str, value: Option<u64>) {
    let name = HeaderName::from_static(name);
    match value {
        Some(v) => {
            headers.insert(name, HeaderValue::from(v));
        }
        None => {
            headers.remove(name);
        }
    }
}

/// Compute the headers to store for an origin `Cache-Control` value.
///
/// Returns `None` when there is no (or an empty) `Cache-Control` header: such
/// responses are not cached.
pub fn encode_for_store(cache_control: Option<&str>) -> Option<StoreHeaders> {
    let raw = cache_control.filter(|cc| !cc.trim().is_empty())?;
    let mut directives = Directives::parse(raw);

    let max_age = directives.get_int(MAX_AGE);
    let swr = directives.get_int(STALE_WHILE_REVALIDATE);
    let sie = directives.get_int(STALE_IF_ERROR);

    directives.remove(STALE_WHILE_REVALIDATE);
    directives.remove(STALE_IF_ERROR);

    if directives.contains(MAX_AGE) {
        let stored = max_age
            .unwrap_or(0)
            .saturating_add(swr.unwrap_or(0).max(sie.unwrap_or(0)));
        directives.set(MAX_AGE, Some(stored.to_string()));
    }

    Some(StoreHeaders {
        cache_control: directives.to_string(),
        stale_while_revalidate: swr,
        stale_if_error: sie,
    })
}

/// Stale windows recorded in an entry's metadata headers.
fn stored_windows(headers: &HeaderMap) -> (Option<u64>, Option<u64>) {
    (
        header_int(headers, header_names::SWR_METADATA),
        header_int(headers, header_names::SIE_METADATA),
    )
}

/// Numeric header value, read like a directive value (`"5abc"` is 5).
fn header_int(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_leading_int)
}

fn stored_cache_control(headers: &HeaderMap) -> Option<&str> {
    headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok())
}

/// Rebuild the headers a client should see for a stored entry.
///
/// `max-age` is lowered back to its real value and non-zero stale windows are
/// re-emitted right after it. A zero window is kept in the store but never
/// shown to the client. Metadata headers are stripped; every other header,
/// including `age`, passes through.
pub fn decode_for_client(stored: &HeaderMap) -> CacheResult<HeaderMap> {
    let (swr, sie) = stored_windows(stored);

    let mut headers = stored.clone();
    headers.remove(header_names::SWR_METADATA);
    headers.remove(header_names::SIE_METADATA);

    let Some(raw) = stored_cache_control(stored) else {
        return Ok(headers);
    };
    let mut directives = Directives::parse(raw);
    let Some(stored_max_age) = directives.get_int(MAX_AGE) else {
        return Ok(headers);
    };

    let extension = swr.unwrap_or(0).max(sie.unwrap_or(0));
    directives.set(MAX_AGE, Some(stored_max_age.saturating_sub(extension).to_string()));

    // Inserted in reverse so the final order is max-age, swr, sie.
    if let Some(sie) = sie.filter(|v| *v > 0) {
        directives.insert_after(MAX_AGE, STALE_IF_ERROR, Some(sie.to_string()));
    }
    if let Some(swr) = swr.filter(|v| *v > 0) {
        directives.insert_after(MAX_AGE, STALE_WHILE_REVALIDATE, Some(swr.to_string()));
    }

    headers.insert(CACHE_CONTROL, HeaderValue::from_str(&directives.to_string())?);
    Ok(headers)
}

/// Read the caching values of a stored entry.
///
/// Returns `None` when the entry has no numeric `age` header, no numeric
/// `max-age` directive, or when the real max-age is not positive.
pub fn extract_caching_values(headers: &HeaderMap) -> Option<CachingValues> {
    let age = header_int(headers, AGE.as_str())?;
    let stored_max_age = Directives::parse_opt(stored_cache_control(headers)).get_int(MAX_AGE)?;
    let (swr, sie) = stored_windows(headers);

    let extension = swr.unwrap_or(0).max(sie.unwrap_or(0));
    let max_age = stored_max_age.checked_sub(extension).filter(|m| *m > 0)?;

    Some(CachingValues {
        age,
        max_age,
        swr,
        sie,
    })
}

/// Set the `x-cache-status` header.
pub fn set_cache_status(headers: &mut HeaderMap, status: CacheStatus) {
    headers.insert(
        HeaderName::from_static(header_names::X_CACHE_STATUS),
        HeaderValue::from_static(status.as_str()),
    );
}
