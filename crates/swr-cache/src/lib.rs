//! Cache-Control encoding and freshness classification for the SWR middleware.
//!
//! This crate provides:
//! - `Directives` - Ordered `Cache-Control` directive sets
//! - `encode_for_store` / `decode_for_client` - Carry stale windows through a max-age-only store
//! - `extract_caching_values` / `Verdict` - Classify a stored entry's freshness
//! - `CacheStore` - Store interface, with `InMemoryStore` for development and tests
//! - `CacheKey` - Request-derived cache keys
//!
//! # Example
//!
//! ```ignore
//! use swr_cache::{encode_for_store, extract_caching_values, Verdict};
//!
//! let overlay = encode_for_store(Some("max-age=10, stale-while-revalidate=5")).unwrap();
//! assert_eq!(overlay.cache_control, "max-age=15");
//!
//! let verdict = Verdict::classify(extract_caching_values(&stored_headers).as_ref());
//! if verdict.should_revalidate() {
//!     // serve stale, refresh in the background
//! }
//! ```

mod directives;
mod error;
mod headers;
mod key;
mod policy;
mod store;

pub use directives::*;
pub use error::*;
pub use headers::*;
pub use key::*;
pub use policy::*;
pub use store::*;
