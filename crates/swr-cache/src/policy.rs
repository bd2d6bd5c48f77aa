//! Freshness classification of cached entries.

use serde::{Deserialize, Serialize};

/// Caching values decoded from a stored entry.
///
/// `max_age` is always the client-facing max-age, never the inflated value
/// the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingValues {
    /// Age of the entry in seconds, as reported by the store.
    pub age: u64,
    /// Real max-age in seconds.
    pub max_age: u64,
    /// `stale-while-revalidate` window in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swr: Option<u64>,
    /// `stale-if-error` window in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sie: Option<u64>,
}

impl CachingValues {
    /// Create caching values without stale windows.
    pub fn new(age: u64, max_age: u64) -> Self {
        Self {
            age,
            max_age,
            swr: None,
            sie: None,
        }
    }

    /// Set the stale-while-revalidate window.
    pub fn with_swr(mut self, swr: u64) -> Self {
        self.swr = Some(swr);
        self
    }

    /// Set the stale-if-error window.
    pub fn with_sie(mut self, sie: u64) -> Self {
        self.sie = Some(sie);
        self
    }

    /// Classify these values.
    pub fn verdict(&self) -> Verdict {
        if self.age <= self.max_age {
            return Verdict::Fresh;
        }

        Verdict::Stale {
            revalidate: self.age <= self.max_age.saturating_add(self.swr.unwrap_or(0)),
            override_error: self.age <= self.max_age.saturating_add(self.sie.unwrap_or(0)),
        }
    }
}

/// What may be done with a cached entry.
///
/// The two stale windows are independent: an entry can be inside both, one,
/// or neither (expired).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "verdict")]
pub enum Verdict {
    /// Nothing usable is cached.
    Absent,
    /// Serve from cache without contacting the origin.
    Fresh,
    /// Past max-age.
    Stale {
        /// Inside the stale-while-revalidate window.
        revalidate: bool,
        /// Inside the stale-if-error window.
        override_error: bool,
    },
}

impl Verdict {
    /// Classify optional caching values; `None` is [`Verdict::Absent`].
    pub fn classify(values: Option<&CachingValues>) -> Self {
        values.map(CachingValues::verdict).unwrap_or(Self::Absent)
    }

    /// Whether a usable entry is cached.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Whether the entry can be served as-is.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }

    /// Whether the entry should be served while the origin is refetched.
    pub fn should_revalidate(&self) -> bool {
        matches!(self, Self::Stale { revalidate: true, .. })
    }

    /// Whether the entry may replace a failed origin response.
    pub fn should_override_error(&self) -> bool {
        matches!(self, Self::Stale { override_error: true, .. })
    }

    /// Whether the entry is past every window.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::Stale {
                revalidate: false,
                override_error: false
            }
        )
    }
}
