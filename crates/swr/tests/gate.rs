use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::header::{HeaderValue, AGE};
use http::{Request, Response, StatusCode};
use swr::prelude::*;

/// Store wrapper counting every call.
struct CountingStore {
    inner: InMemoryStore,
    lookups: AtomicUsize,
    stores: AtomicUsize,
}

impl CountingStore {
    fn new(clock: &ManualClock) -> Self {
        Self {
            inner: InMemoryStore::with_clock(Arc::new(clock.clone())),
            lookups: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(key).await
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> CacheResult<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(key, entry).await
    }
}

struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn lookup(&self, _key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        Err(CacheError::Storage("unreachable".into()))
    }

    async fn store(&self, _key: &CacheKey, _entry: CacheEntry) -> CacheResult<()> {
        Err(CacheError::Storage("unreachable".into()))
    }
}

/// Store that keeps every entry forever and reports its age.
struct KeepingStore {
    clock: ManualClock,
    entries: Mutex<HashMap<CacheKey, (u64, CacheEntry)>>,
    stores: AtomicUsize,
}

impl KeepingStore {
    fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            entries: Mutex::new(HashMap::new()),
            stores: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CacheStore for KeepingStore {
    async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).map(|(stored_at, entry)| {
            let mut entry = entry.clone();
            let age = self.clock.now_secs() - stored_at;
            entry.headers.insert(AGE, HeaderValue::from(age));
            entry
        }))
    }

    async fn store(&self, key: &CacheKey, entry: CacheEntry) -> CacheResult<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now_secs();
        self.entries.lock().unwrap().insert(key.clone(), (now, entry));
        Ok(())
    }
}

/// Origin answering with a fixed `Cache-Control`, counting calls.
///
/// While `failing` is `Some`, it answers with that status, or errors when the
/// status is 0.
struct TestOrigin {
    cache_control: &'static str,
    status: StatusCode,
    calls: AtomicUsize,
    failing: std::sync::Mutex<Option<u16>>,
}

impl TestOrigin {
    fn new(cache_control: &'static str) -> Arc<Self> {
        Self::with_status(cache_control, StatusCode::OK)
    }

    fn with_status(cache_control: &'static str, status: StatusCode) -> Arc<Self> {
        Arc::new(Self {
            cache_control,
            status,
            calls: AtomicUsize::new(0),
            failing: std::sync::Mutex::new(None),
        })
    }

    fn fail_with(&self, status: u16) {
        *self.failing.lock().unwrap() = Some(status);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Origin for TestOrigin {
    async fn fetch(&self, request: Request<Body>) -> OriginResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = *self.failing.lock().unwrap();
        match failing {
            Some(0) => Err(OriginError::Unavailable("connection refused".into())),
            Some(status) => Ok(Response::builder()
                .status(status)
                .header("cache-control", "no-store")
                .body(b"error".to_vec())
                .unwrap()),
            None => Ok(Response::builder()
                .status(self.status)
                .header("cache-control", self.cache_control)
                .body(format!("{} #{}", request.uri().path(), call).into_bytes())
                .unwrap()),
        }
    }
}

fn get(path: &str) -> Request<Body> {
    Request::get(format!("https://example.com{}", path))
        .body(Vec::new())
        .unwrap()
}

fn gate(origin: &Arc<TestOrigin>, store: Arc<dyn CacheStore>, config: SwrConfig) -> Swr {
    Swr::new(origin.clone(), store, config.with_explain_headers(true))
}

fn cache_status(response: &Response<Body>) -> &str {
    response.headers()[header_names::X_CACHE_STATUS].to_str().unwrap()
}

#[tokio::test]
async fn test_stale_while_revalidate_scenario() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-while-revalidate=5");
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    // Age 0: miss, stored.
    let first = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&first), "MISS");
    assert_eq!(first.body(), b"/page #1");
    assert_eq!(origin.calls(), 1);
    assert_eq!(store.stores.load(Ordering::SeqCst), 1);

    // Age 0: fresh hit.
    let second = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&second), "HIT");
    assert_eq!(second.body(), b"/page #1");
    assert_eq!(
        second.headers()["cache-control"],
        "max-age=1, stale-while-revalidate=5"
    );
    assert!(second.headers().get(header_names::SWR_METADATA).is_none());
    assert_eq!(origin.calls(), 1);

    // Age 3: stale hit, one background revalidation.
    clock.set(3);
    let third = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&third), "STALE");
    assert_eq!(third.body(), b"/page #1");
    assert_eq!(third.headers()["age"], "3");
    swr.tasks().drain().await;
    assert_eq!(origin.calls(), 2);
    assert_eq!(swr.metrics().snapshot().revalidations_scheduled, 1);
    assert_eq!(swr.metrics().snapshot().revalidations_completed, 1);

    // Age 10 past the revalidated copy: the origin is called again.
    clock.set(13);
    let fourth = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&fourth), "MISS");
    assert_eq!(fourth.body(), b"/page #3");
    assert_eq!(origin.calls(), 3);
    assert_eq!(swr.metrics().snapshot().revalidations_scheduled, 1);
}

#[tokio::test]
async fn test_revalidated_entry_is_served() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-while-revalidate=5");
    let swr = gate(&origin, store, SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    clock.set(2);
    swr.handle(get("/page")).await.unwrap();
    swr.tasks().drain().await;

    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&response), "HIT");
    assert_eq!(response.body(), b"/page #2");
    assert_eq!(response.headers()["age"], "0");
}

#[tokio::test]
async fn test_non_get_never_touches_store() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=60");
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    for method in ["POST", "PUT", "DELETE", "HEAD"] {
        let request = Request::builder()
            .method(method)
            .uri("https://example.com/page")
            .body(Vec::new())
            .unwrap();
        let response = swr.handle(request).await.unwrap();
        assert_eq!(cache_status(&response), "BYPASS");
    }

    assert_eq!(origin.calls(), 4);
    assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(store.stores.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stale_if_error_masks_origin_error() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-if-error=10");
    let swr = gate(&origin, store, SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    origin.fail_with(0);
    clock.set(5);

    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "STALE-IF-ERROR");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), b"/page #1");
    assert_eq!(
        response.headers()["cache-control"],
        "max-age=1, stale-if-error=10"
    );
    assert!(response.headers().get(header_names::SIE_METADATA).is_none());
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn test_stale_if_error_masks_server_error() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-if-error=10");
    let swr = gate(&origin, store, SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    origin.fail_with(503);
    clock.set(11);

    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "STALE-IF-ERROR");
    assert_eq!(response.body(), b"/page #1");
}

#[tokio::test]
async fn test_server_error_after_stale_if_error_window_is_written_through() {
    let clock = ManualClock::new();
    let store = Arc::new(KeepingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-if-error=2");
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    origin.fail_with(503);

    // Age 3 is the last second of the window.
    clock.set(3);
    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&response), "STALE-IF-ERROR");
    assert_eq!(store.stores.load(Ordering::SeqCst), 1);

    clock.set(4);
    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "MISS");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body(), b"error");
    assert_eq!(origin.calls(), 3);
    assert_eq!(store.stores.load(Ordering::SeqCst), 2);

    let key = CacheKey::for_request(DEFAULT_CACHE_NAME, &get("/page"));
    let stored = store.lookup(&key).await.unwrap().unwrap();
    assert_eq!(stored.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_non_positive_max_age_always_misses() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=0, stale-while-revalidate=5");
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    for (at, call) in [(0, 1), (0, 2), (3, 3)] {
        clock.set(at);
        let response = swr.handle(get("/page")).await.unwrap();

        assert_eq!(cache_status(&response), "MISS");
        assert_eq!(response.body(), format!("/page #{}", call).as_bytes());
    }

    // Stored with the inflated max-age, but never served.
    let key = CacheKey::for_request(DEFAULT_CACHE_NAME, &get("/page"));
    assert!(store.inner.lookup(&key).await.unwrap().is_some());
    assert_eq!(origin.calls(), 3);
    assert_eq!(swr.metrics().snapshot().revalidations_scheduled, 0);
    assert_eq!(swr.tasks().pending(), 0);
}

#[tokio::test]
async fn test_client_error_is_not_masked() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-if-error=10");
    let swr = gate(&origin, store, SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    origin.fail_with(404);
    clock.set(5);

    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "MISS");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_origin_failure_without_entry_propagates() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-if-error=10");
    origin.fail_with(0);
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    let result = swr.handle(get("/page")).await;

    assert!(matches!(result, Err(OriginError::Unavailable(_))));
    assert_eq!(store.stores.load(Ordering::SeqCst), 0);
    assert_eq!(swr.metrics().count(CacheStatus::Miss), 1);

    origin.fail_with(500);
    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_stale_revalidate_takes_precedence_over_origin_call() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-while-revalidate=10, stale-if-error=10");
    let swr = gate(&origin, store, SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    origin.fail_with(0);
    clock.set(5);

    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&response), "STALE");

    // The failed revalidation is contained.
    swr.tasks().drain().await;
    assert_eq!(swr.metrics().snapshot().revalidations_failed, 1);

    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&response), "STALE");
    assert_eq!(response.body(), b"/page #1");
    swr.tasks().drain().await;
}

#[tokio::test]
async fn test_cached_not_modified_is_ignored_by_default() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::with_status("max-age=60", StatusCode::NOT_MODIFIED);
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "MISS");
    assert_eq!(origin.calls(), 2);
    assert_eq!(store.stores.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cached_not_modified_served_when_enabled() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::with_status("max-age=60", StatusCode::NOT_MODIFIED);
    let swr = gate(
        &origin,
        store,
        SwrConfig::new().with_cached_not_modified(true),
    );

    swr.handle(get("/page")).await.unwrap();
    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "HIT");
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(origin.calls(), 1);
}

#[tokio::test]
async fn test_zero_windows_are_tracked_but_hidden() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=10, stale-while-revalidate=0, stale-if-error=0");
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();

    let key = CacheKey::for_request(DEFAULT_CACHE_NAME, &get("/page"));
    let stored = store.inner.lookup(&key).await.unwrap().unwrap();
    assert_eq!(stored.headers["cache-control"], "max-age=10");
    assert_eq!(stored.headers[header_names::SWR_METADATA], "0");
    assert_eq!(stored.headers[header_names::SIE_METADATA], "0");

    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&response), "HIT");
    assert_eq!(response.headers()["cache-control"], "max-age=10");
    assert!(response.headers().get(header_names::SWR_METADATA).is_none());
    assert!(response.headers().get(header_names::SIE_METADATA).is_none());
}

#[tokio::test]
async fn test_uncacheable_response_is_not_stored() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("");
    let swr = gate(&origin, store.clone(), SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    swr.handle(get("/page")).await.unwrap();

    assert_eq!(origin.calls(), 2);
    assert_eq!(store.stores.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_failure_never_fails_request() {
    let origin = TestOrigin::new("max-age=60");
    let swr = gate(&origin, Arc::new(BrokenStore), SwrConfig::default());

    let response = swr.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "MISS");
    assert_eq!(response.body(), b"/page #1");
    assert_eq!(swr.metrics().snapshot().store_errors, 2);
}

#[tokio::test]
async fn test_explain_header_disabled_by_default() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=60");
    let swr = Swr::new(origin.clone(), store, SwrConfig::default());

    let response = swr.handle(get("/page")).await.unwrap();

    assert!(response.headers().get(header_names::X_CACHE_STATUS).is_none());
}

#[tokio::test]
async fn test_cache_name_namespaces_keys() {
    let clock = ManualClock::new();
    let store: Arc<dyn CacheStore> = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=60");

    let a = gate(&origin, store.clone(), SwrConfig::new().with_cache_name("a"));
    let b = gate(&origin, store, SwrConfig::new().with_cache_name("b"));

    a.handle(get("/page")).await.unwrap();
    let response = b.handle(get("/page")).await.unwrap();

    assert_eq!(cache_status(&response), "MISS");
    assert_eq!(origin.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_stale_requests_all_served() {
    let clock = ManualClock::new();
    let store = Arc::new(CountingStore::new(&clock));
    let origin = TestOrigin::new("max-age=1, stale-while-revalidate=5");
    let swr = gate(&origin, store, SwrConfig::default());

    swr.handle(get("/page")).await.unwrap();
    clock.set(3);

    let responses =
        futures::future::join_all((0..4).map(|_| swr.handle(get("/page")))).await;

    for response in responses {
        let response = response.unwrap();
        assert_eq!(cache_status(&response), "STALE");
        assert_eq!(response.body(), b"/page #1");
    }

    // Each stale hit schedules its own refresh; the last write wins.
    swr.tasks().drain().await;
    assert_eq!(swr.metrics().snapshot().revalidations_scheduled, 4);
    assert_eq!(origin.calls(), 5);

    let response = swr.handle(get("/page")).await.unwrap();
    assert_eq!(cache_status(&response), "HIT");
}
