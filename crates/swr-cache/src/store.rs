//! Cache store interface and an in-memory max-age store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, AGE, CACHE_CONTROL};
use http::{Response, StatusCode};
use swr_core::Body;

use crate::directives::{Directives, MAX_AGE};
use crate::error::{CacheError, CacheResult};
use crate::headers::encode_for_store;
use crate::key::CacheKey;

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Response status.
    pub status: StatusCode,
    /// Response headers, including encoded metadata.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Body,
}

impl CacheEntry {
    /// Copy a response into a cache entry.
    pub fn from_response(response: &Response<Body>) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: response.body().clone(),
        }
    }

    /// Turn the entry into a response.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    /// Whether the stored status is 304 Not Modified.
    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }
}

/// Cache store backend trait.
///
/// Stores hold opaque entries keyed by request identity and own expiry. On
/// lookup a store reports the entry's age in seconds through the `age` header.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry.
    async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>>;

    /// Store an entry, replacing any existing one.
    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> CacheResult<()>;
}

/// Encode a response's caching headers and write it to the store.
///
/// Returns `Ok(false)` without touching the store when the response has no
/// `Cache-Control` header.
pub async fn cache_response(
    store: &dyn CacheStore,
    key: &CacheKey,
    response: &Response<Body>,
) -> CacheResult<bool> {
    let cache_control = response
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok());
    let Some(overlay) = encode_for_store(cache_control) else {
        return Ok(false);
    };

    let mut entry = CacheEntry::from_response(response);
    overlay.apply(&mut entry.headers)?;
    store.store(key, entry).await?;
    Ok(true)
}

/// Source of the current time in whole seconds.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary fixed epoch.
    fn now_secs(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually advanced clock for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the current time.
    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: CacheEntry,
    stored_at: u64,
    ttl: u64,
}

/// In-memory store that only understands `max-age`.
///
/// Entries without a positive `max-age`, or marked `no-store`, are not kept.
/// An entry whose age has passed `max-age` is evicted on its next lookup, or
/// by the sweep every write makes over the whole map.
pub struct InMemoryStore {
    entries: RwLock<HashMap<CacheKey, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    /// Create a store using wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store using the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::Storage("store lock poisoned".to_string())
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let now = self.clock.now_secs();

        let stored = {
            let entries = self.entries.read().map_err(poisoned)?;
            match entries.get(key) {
                Some(stored) => stored.clone(),
                None => return Ok(None),
            }
        };

        let age = now.saturating_sub(stored.stored_at);
        if age > stored.ttl {
            tracing::trace!(key = %key, age, ttl = stored.ttl, "evicting expired entry");
            self.entries.write().map_err(poisoned)?.remove(key);
            return Ok(None);
        }

        let mut entry = stored.entry;
        entry.headers.insert(AGE, HeaderValue::from(age));
        Ok(Some(entry))
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> CacheResult<()> {
        let directives = Directives::parse_opt(
            entry
                .headers
                .get(CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
        );

        let ttl = match directives.get_int(MAX_AGE) {
            Some(ttl) if ttl > 0 && !directives.contains("no-store") => ttl,
            _ => {
                tracing::trace!(key = %key, "entry not storable");
                return Ok(());
            }
        };

        let now = self.clock.now_secs();
        let mut entries = self.entries.write().map_err(poisoned)?;
        let before = entries.len();
        entries.retain(|_, stored| now.saturating_sub(stored.stored_at) <= stored.ttl);
        if entries.len() < before {
            tracing::trace!(evicted = before - entries.len(), "swept expired entries");
        }

        entries.insert(
            key.clone(),
            StoredEntry {
                entry,
                stored_at: now,
                ttl,
            },
        );
        Ok(())
    }
}
