//! Core types for the stale-while-revalidate caching middleware.
//!
//! This crate provides the fundamental types and traits:
//! - `Origin` trait - The wrapped request handler
//! - `OriginError` - Failures surfaced by an origin
//! - `SwrConfig` - Middleware configuration
//! - `RequestId` - Per-request correlation identifier

mod config;
mod context;
mod origin;

pub use config::*;
pub use context::*;
pub use origin::*;
