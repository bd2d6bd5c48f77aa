//! `Cache-Control` directive parsing and serialization.

use std::fmt;

/// `max-age` directive name.
pub const MAX_AGE: &str = "max-age";
/// `stale-while-revalidate` directive name.
pub const STALE_WHILE_REVALIDATE: &str = "stale-while-revalidate";
/// `stale-if-error` directive name.
pub const STALE_IF_ERROR: &str = "stale-if-error";

/// An ordered set of `Cache-Control` directives.
///
/// Names are stored lower-cased and are unique. Values are kept as the raw
/// text after the first `=`, so directives this crate does not understand
/// survive a parse/serialize cycle unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    entries: Vec<(String, Option<String>)>,
}

impl Directives {
    /// Create an empty directive set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cache-Control` header value.
    ///
    /// A repeated directive keeps its first position and takes the last value.
    /// Empty tokens (`"a,,b"`, trailing commas) are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut directives = Self::new();

        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (name, value) = match token.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
                None => (token, None),
            };
            directives.set(name.to_ascii_lowercase(), value);
        }

        directives
    }

    /// Parse an optional header value; `None` yields an empty set.
    pub fn parse_opt(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    /// Check whether a directive is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Get the raw value of a directive.
    ///
    /// Returns `None` both when the directive is absent and when it has no
    /// value; use [`Directives::contains`] to tell them apart.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|i| self.entries[i].1.as_deref())
    }

    /// Get a directive's value as a non-negative integer.
    ///
    /// Leading digits are read the way HTTP delta-seconds are commonly parsed
    /// (`"10abc"` is 10). Values with no leading digit, such as `vary=accept`
    /// or `max-age=-1`, are `None`.
    pub fn get_int(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(parse_leading_int)
    }

    /// Insert or replace a directive, keeping its position if it exists.
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into().to_ascii_lowercase();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Insert a directive right after another one, or at the end if `after`
    /// is absent. An existing directive with the same name is removed first.
    pub fn insert_after(&mut self, after: &str, name: impl Into<String>, value: Option<String>) {
        let name = name.into().to_ascii_lowercase();
        self.remove(&name);
        let at = self
            .position(after)
            .map(|i| i + 1)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (name, value));
    }

    /// Remove a directive, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Option<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Number of directives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no directives.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Directives {
    /// Serialize as `name` or `name=value` joined by `", "`.
    ///
    /// Empty values serialize as the bare name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value.as_deref() {
                Some(v) if !v.is_empty() => write!(f, "{}={}", name, v)?,
                _ => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_leading_int(value: &str) -> Option<u64> {
    let value = value.trim_start();
    let digits = value
        .find(|c: char| !c.is_ascii_digit())
        .map(|end| &value[..end])
        .unwrap_or(value);
    digits.parse().ok()
}
