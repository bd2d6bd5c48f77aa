//! Logging and cache metrics for the SWR middleware.
//!
//! This crate provides:
//! - `init_logging` - Install a `tracing` subscriber (human or JSON output)
//! - `CacheMetrics` - Counters for cache outcomes and background revalidations

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
