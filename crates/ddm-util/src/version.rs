//! Dotted OS version strings
//!
//! Versions compare component-wise with missing trailing components treated
//! as zero, so `15` == `15.0.0` and `15.1` > `15.0.9`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A dotted numeric version such as `15.1.2`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct OsVersion {
    raw: String,
    components: Vec<u64>,
}

impl OsVersion {
    /// Parse a dotted version string.
    ///
    /// Components that are not plain integers are skipped.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let components = raw
            .split('.')
            .filter_map(|part| part.parse::<u64>().ok())
            .collect();
        Self {
            raw: raw.to_string(),
            components,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric components, in order
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Major component (integer prefix before the first `.`), or 0 when absent
    pub fn major(&self) -> u64 {
        self.raw
            .split('.')
            .next()
            .and_then(|part| part.parse().ok())
            .unwrap_or(0)
    }

    /// True when `self` is strictly older than `target`
    pub fn is_older_than(&self, target: &OsVersion) -> bool {
        self < target
    }

    /// True when moving from `self` to `target` crosses a major version
    pub fn is_major_change_to(&self, target: &OsVersion) -> bool {
        self.major() != target.major()
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for OsVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OsVersion {}

impl PartialOrd for OsVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OsVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for OsVersion {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for OsVersion {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<OsVersion> for String {
    fn from(v: OsVersion) -> Self {
        v.raw
    }
}
