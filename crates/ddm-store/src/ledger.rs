//! Persisted deferral ledger record

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Per-device deferral history.
///
/// `deferral_count` counts deferrals spent against the current deadline only;
/// it is reset when a new deadline is observed (if policy allows).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub deferral_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deadline: Option<DateTime<Local>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deferral_date: Option<DateTime<Local>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<DateTime<Local>>,
}

impl LedgerState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of reading the persisted ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLoad {
    /// No ledger yet (first run)
    Missing,
    Loaded(LedgerState),
    /// Present but unreadable or not valid JSON
    Corrupt { detail: String },
}
