//! The request gate.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, Request, Response};
use swr_cache::{
    cache_response, decode_for_client, extract_caching_values, header_names, set_cache_status,
    CacheEntry, CacheKey, CacheStatus, CacheStore, Verdict,
};
use swr_core::{clone_request, Body, Origin, OriginResult, RequestId, SwrConfig};
use swr_executor::{apply_fallback, BackgroundTasks, FallbackResult, Revalidator};
use swr_observability::CacheMetrics;
use tracing::Instrument;

/// Caching middleware wrapping an origin.
///
/// Per request:
/// 1. Non-GET requests go straight to the origin; the store is not touched.
/// 2. A fresh entry is served without contacting the origin.
/// 3. An entry inside its stale-while-revalidate window is served while a
///    background task refetches it.
/// 4. Otherwise the origin is called. If it fails, or answers 5xx, an entry
///    inside its stale-if-error window is served instead.
/// 5. Successful origin responses carrying `Cache-Control` are written
///    through to the store.
///
/// Store failures are logged and never fail a request.
pub struct Swr {
    origin: Arc<dyn Origin>,
    store: Arc<dyn CacheStore>,
    config: SwrConfig,
    tasks: BackgroundTasks,
    metrics: Arc<CacheMetrics>,
    revalidator: Revalidator,
}

/// Wrap `origin` with the default configuration.
pub fn with_swr<O>(origin: O, store: Arc<dyn CacheStore>) -> Swr
where
    O: Origin + 'static,
{
    Swr::new(Arc::new(origin), store, SwrConfig::default())
}

impl Swr {
    /// Create a gate with a fresh task set and metrics.
    pub fn new(origin: Arc<dyn Origin>, store: Arc<dyn CacheStore>, config: SwrConfig) -> Self {
        Self::with_parts(
            origin,
            store,
            config,
            BackgroundTasks::new(),
            Arc::new(CacheMetrics::new()),
        )
    }

    /// Create a gate sharing a task set and metrics with other components.
    pub fn with_parts(
        origin: Arc<dyn Origin>,
        store: Arc<dyn CacheStore>,
        config: SwrConfig,
        tasks: BackgroundTasks,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        let revalidator = Revalidator::new(
            store.clone(),
            origin.clone(),
            tasks.clone(),
            metrics.clone(),
        );
        Self {
            origin,
            store,
            config,
            tasks,
            metrics,
            revalidator,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SwrConfig) -> Self {
        self.config = config;
        self
    }

    /// Background revalidations spawned by this gate.
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Outcome counters.
    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Active configuration.
    pub fn config(&self) -> &SwrConfig {
        &self.config
    }

    /// Handle a request.
    pub async fn handle(&self, request: Request<Body>) -> OriginResult {
        let request_id = RequestId::generate();
        let span = tracing::info_span!(
            "swr",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri()
        );
        self.serve(request).instrument(span).await
    }

    async fn serve(&self, request: Request<Body>) -> OriginResult {
        if request.method() != Method::GET {
            let result = self.origin.fetch(request).await;
            return self.finish(result, CacheStatus::Bypass);
        }

        let key = CacheKey::for_request(&self.config.cache_name, &request);
        let cached = self.lookup(&key).await;
        let values = cached
            .as_ref()
            .and_then(|entry| extract_caching_values(&entry.headers));
        let verdict = Verdict::classify(values.as_ref());
        tracing::debug!(key = %key, ?verdict, "classified");

        if let Some(entry) = cached.as_ref() {
            if verdict.is_fresh() {
                return self.finish(Ok(client_response(entry.clone())), CacheStatus::Hit);
            }
            if verdict.should_revalidate() {
                self.revalidator.schedule(key, clone_request(&request));
                return self.finish(Ok(client_response(entry.clone())), CacheStatus::Stale);
            }
        }

        let result = self.origin.fetch(request).await;

        match apply_fallback(result, cached, &verdict) {
            FallbackResult::Stale { entry, cause } => {
                tracing::warn!(key = %key, cause = %cause, "origin failed, serving stale entry");
                self.finish(Ok(client_response(entry)), CacheStatus::StaleIfError)
            }
            FallbackResult::Origin(result) => {
                if let Ok(response) = &result {
                    self.write_through(&key, response).await;
                }
                self.finish(result, CacheStatus::Miss)
            }
        }
    }

    /// Look up a usable entry. Lookup errors count as a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.store.lookup(key).await {
            Ok(Some(entry)) if entry.is_not_modified() && !self.config.serve_cached_not_modified => {
                tracing::debug!(key = %key, "ignoring cached 304");
                None
            }
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache lookup failed");
                self.metrics.store_error();
                None
            }
        }
    }

    async fn write_through(&self, key: &CacheKey, response: &Response<Body>) {
        match cache_response(self.store.as_ref(), key, response).await {
            Ok(true) => tracing::debug!(key = %key, "stored origin response"),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to store origin response");
                self.metrics.store_error();
            }
        }
    }

    fn finish(&self, mut result: OriginResult, status: CacheStatus) -> OriginResult {
        self.metrics.record(status);
        match &mut result {
            Ok(response) => {
                tracing::debug!(cache = %status, status = %response.status(), "served");
                if self.config.explain_headers {
                    set_cache_status(response.headers_mut(), status);
                }
            }
            Err(err) => tracing::debug!(cache = %status, error = %err, "origin failed"),
        }
        result
    }
}

/// Turn a stored entry into the response a client sees.
fn client_response(entry: CacheEntry) -> Response<Body> {
    let headers = match decode_for_client(&entry.headers) {
        Ok(headers) => headers,
        Err(err) => {
            tracing::warn!(error = %err, "could not decode cached headers");
            let mut headers = entry.headers.clone();
            headers.remove(header_names::SWR_METADATA);
            headers.remove(header_names::SIE_METADATA);
            headers
        }
    };
    CacheEntry { headers, ..entry }.into_response()
}

#[async_trait]
impl Origin for Swr {
    async fn fetch(&self, request: Request<Body>) -> OriginResult {
        self.handle(request).await
    }
}
