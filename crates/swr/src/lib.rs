//! Stale-while-revalidate caching middleware.
//!
//! This crate re-exports the middleware's parts and provides the request gate
//! that ties them together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use swr::prelude::*;
//!
//! let origin = origin_fn(|request| async move { render(request).await });
//! let swr = with_swr(origin, Arc::new(InMemoryStore::new()));
//!
//! let response = swr.handle(request).await?;
//!
//! // Before shutdown, let background revalidations finish.
//! swr.tasks().drain().await;
//! ```

mod gate;

pub use gate::*;

pub use swr_cache;
pub use swr_core;
pub use swr_executor;
pub use swr_observability;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::gate::*;
    pub use swr_cache::*;
    pub use swr_core::*;
    pub use swr_executor::*;
    pub use swr_observability::*;
}
