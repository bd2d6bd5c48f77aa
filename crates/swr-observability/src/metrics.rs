//! Cache outcome counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use swr_cache::CacheStatus;

/// Process-wide counters for the SWR middleware.
///
/// Counters are relaxed atomics; a snapshot is a consistent view of each
/// counter, not of all counters at one instant.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hit: AtomicU64,
    stale: AtomicU64,
    stale_if_error: AtomicU64,
    miss: AtomicU64,
    bypass: AtomicU64,
    revalidations_scheduled: AtomicU64,
    revalidations_completed: AtomicU64,
    revalidations_failed: AtomicU64,
    store_errors: AtomicU64,
}

impl CacheMetrics {
    /// Create a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, status: CacheStatus) -> &AtomicU64 {
        match status {
            CacheStatus::Hit => &self.hit,
            CacheStatus::Stale => &self.stale,
            CacheStatus::StaleIfError => &self.stale_if_error,
            CacheStatus::Miss => &self.miss,
            CacheStatus::Bypass => &self.bypass,
        }
    }

    /// Record how a request was answered.
    pub fn record(&self, status: CacheStatus) {
        self.counter(status).fetch_add(1, Ordering::Relaxed);
    }

    /// Number of requests answered with a status.
    pub fn count(&self, status: CacheStatus) -> u64 {
        self.counter(status).load(Ordering::Relaxed)
    }

    /// Record a background revalidation being scheduled.
    pub fn revalidation_scheduled(&self) {
        self.revalidations_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a background revalidation finishing.
    pub fn revalidation_completed(&self) {
        self.revalidations_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a background revalidation failing.
    pub fn revalidation_failed(&self) {
        self.revalidations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed store read or write.
    pub fn store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let responses = CacheStatus::ALL
            .iter()
            .map(|status| (status.to_string(), self.count(*status)))
            .collect();

        MetricsSnapshot {
            responses,
            revalidations_scheduled: self.revalidations_scheduled.load(Ordering::Relaxed),
            revalidations_completed: self.revalidations_completed.load(Ordering::Relaxed),
            revalidations_failed: self.revalidations_failed.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`CacheMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Responses per cache status.
    pub responses: BTreeMap<String, u64>,
    /// Background revalidations started.
    pub revalidations_scheduled: u64,
    /// Background revalidations that got a response from the origin.
    pub revalidations_completed: u64,
    /// Background revalidations whose origin call failed.
    pub revalidations_failed: u64,
    /// Store reads or writes that failed.
    pub store_errors: u64,
}

impl MetricsSnapshot {
    /// Total responses recorded.
    pub fn total(&self) -> u64 {
        self.responses.values().sum()
    }

    /// Share of responses served from cache, if any were recorded.
    pub fn cache_ratio(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let cached: u64 = CacheStatus::ALL
            .iter()
            .filter(|s| s.is_cached())
            .filter_map(|s| self.responses.get(s.as_str()))
            .sum();
        Some(cached as f64 / total as f64)
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
