//! Background revalidation of stale entries.

use std::sync::Arc;

use http::Request;
use swr_cache::{cache_response, CacheKey, CacheStore};
use swr_core::{Body, Origin};
use swr_observability::CacheMetrics;

use crate::scheduler::BackgroundTasks;

/// Outcome of a single revalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// The fresh response was written to the store.
    Stored,
    /// The origin answered without a `Cache-Control` header; nothing stored.
    NotCacheable,
    /// The origin call failed.
    OriginFailed(String),
    /// The store rejected the write.
    StoreFailed(String),
}

/// Refetches stale entries from the origin without blocking the response.
#[derive(Clone)]
pub struct Revalidator {
    store: Arc<dyn CacheStore>,
    origin: Arc<dyn Origin>,
    tasks: BackgroundTasks,
    metrics: Arc<CacheMetrics>,
}

impl Revalidator {
    /// Create a revalidator spawning onto `tasks`.
    pub fn new(
        store: Arc<dyn CacheStore>,
        origin: Arc<dyn Origin>,
        tasks: BackgroundTasks,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        Self {
            store,
            origin,
            tasks,
            metrics,
        }
    }

    /// Schedule a refetch of `request`, storing the result under `key`.
    ///
    /// Returns immediately. The result overwrites whatever is stored under
    /// `key` (last writer wins). Failures are logged and counted, never
    /// returned.
    pub fn schedule(&self, key: CacheKey, request: Request<Body>) {
        self.metrics.revalidation_scheduled();
        tracing::debug!(key = %key, "scheduling revalidation");

        let this = self.clone();
        self.tasks.spawn("revalidate", async move {
            let outcome = this.revalidate(&key, request).await;
            match &outcome {
                RevalidationOutcome::Stored | RevalidationOutcome::NotCacheable => {
                    this.metrics.revalidation_completed();
                }
                RevalidationOutcome::OriginFailed(_) => this.metrics.revalidation_failed(),
                RevalidationOutcome::StoreFailed(_) => {
                    this.metrics.store_error();
                    this.metrics.revalidation_failed();
                }
            }
        });
    }

    /// Refetch and re-store in the current task.
    pub async fn revalidate(&self, key: &CacheKey, request: Request<Body>) -> RevalidationOutcome {
        let response = match self.origin.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "revalidation failed");
                return RevalidationOutcome::OriginFailed(err.to_string());
            }
        };

        match cache_response(self.store.as_ref(), key, &response).await {
            Ok(true) => {
                tracing::debug!(key = %key, status = %response.status(), "revalidated");
                RevalidationOutcome::Stored
            }
            Ok(false) => {
                tracing::debug!(key = %key, "revalidated response not cacheable");
                RevalidationOutcome::NotCacheable
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to store revalidated response");
                RevalidationOutcome::StoreFailed(err.to_string())
            }
        }
    }
}
