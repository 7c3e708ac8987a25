//! Strongly-typed identifiers for ddm-reminder

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for one scheduler invocation.
///
/// Attached to the root tracing span and written into the health snapshot so
/// log lines and telemetry from the same run can be matched up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reverse-DNS preference domain (e.g. `com.example.ddmreminder`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreferenceDomain(String);

impl PreferenceDomain {
    /// Validate and wrap a reverse-DNS domain.
    ///
    /// Requires at least two dot-separated labels of ASCII alphanumerics.
    pub fn parse(domain: &str) -> Option<Self> {
        let mut labels = 0;
        for label in domain.split('.') {
            if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric()) {
                return None;
            }
            labels += 1;
        }
        if labels < 2 {
            return None;
        }
        Some(Self(domain.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PreferenceDomain {
    fn default() -> Self {
        Self("com.example.ddmreminder".to_string())
    }
}

impl fmt::Display for PreferenceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
