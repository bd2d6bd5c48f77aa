//! Background revalidation and stale-if-error fallback.
//!
//! This crate provides:
//! - `BackgroundTasks` - Detached tasks that outlive the response, drained before teardown
//! - `Revalidator` - Refetch from the origin and re-store in the background
//! - `apply_fallback` - Mask origin failures with a stale entry

mod fallback;
mod revalidate;
mod scheduler;

pub use fallback::*;
pub use revalidate::*;
pub use scheduler::*;
