//! Request identity for log correlation.

use std::sync::atomic::{AtomicU32, Ordering};

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let id = format!(
            "{:x}-{:x}-{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            rand_simple(),
            rand_simple()
        );
        Self(id)
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// LCG step over a shared seed; uniqueness comes from the timestamp part.
fn rand_simple() -> u32 {
    static SEED: AtomicU32 = AtomicU32::new(12345);
    let step = |s: u32| s.wrapping_mul(1103515245).wrapping_add(12345);
    let prev = SEED
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| Some(step(s)))
        .unwrap_or_default();
    step(prev)
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
