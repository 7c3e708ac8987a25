//! Enforcement deadline extraction from the system install log
//!
//! The OS writes a line such as
//!
//! ```text
//! ... |EnforcedInstallDate:2025-11-25T12:00:00Z|VersionString:15.1|BuildVersionString:24B83| ...
//! ```
//!
//! whenever a declarative update enforcement is (re)applied. Once that date
//! lapses the OS may relax it and log
//!
//! ```text
//! ... setPastDuePaddedEnforcementDate is set: Thu Nov 13 08:59:56 2025
//! ```
//!
//! The most recent line of each kind wins.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use ddm_util::{OsVersion, format_deadline, whole_days_until, whole_hours_until};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Marker of an enforcement line
pub const ENFORCEMENT_MARKER: &str = "EnforcedInstallDate";

/// Marker of a relaxed deadline applied after the original lapsed
pub const PADDED_DEADLINE_MARKER: &str = "setPastDuePaddedEnforcementDate is set:";

const KEY_DEADLINE: &str = "EnforcedInstallDate";
const KEY_VERSION: &str = "VersionString";
const KEY_BUILD: &str = "BuildVersionString";

const LOCAL_DEADLINE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const PADDED_DEADLINE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Where the deadline in a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineSource {
    Enforced,
    Padded,
}

/// The enforcement currently in effect, derived fresh on every invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnforcementRecord {
    pub target_version: OsVersion,
    /// Empty when the log line carries no build
    pub target_build: String,
    pub deadline: DateTime<Local>,
    pub deadline_formatted: String,
    pub deadline_source: DeadlineSource,
    /// Floored; negative once overdue
    pub days_remaining: i64,
    /// Floored; negative once overdue
    pub hours_remaining: i64,
    /// Target crosses a major version boundary
    pub is_upgrade: bool,
}

impl EnforcementRecord {
    /// Record for an enforced deadline, with remaining time measured from `now`
    pub fn new(
        target_version: OsVersion,
        target_build: String,
        deadline: DateTime<Local>,
        installed: &OsVersion,
        now: DateTime<Local>,
    ) -> Self {
        let is_upgrade = installed.is_major_change_to(&target_version);
        Self {
            target_version,
            target_build,
            deadline,
            deadline_formatted: format_deadline(&deadline),
            deadline_source: DeadlineSource::Enforced,
            days_remaining: whole_days_until(&deadline, &now),
            hours_remaining: whole_hours_until(&deadline, &now),
            is_upgrade,
        }
    }

    /// Swap in a relaxed deadline, keeping target and upgrade flag
    fn with_padded_deadline(self, deadline: DateTime<Local>, now: DateTime<Local>) -> Self {
        Self {
            deadline,
            deadline_formatted: format_deadline(&deadline),
            deadline_source: DeadlineSource::Padded,
            days_remaining: whole_days_until(&deadline, &now),
            hours_remaining: whole_hours_until(&deadline, &now),
            ..self
        }
    }

    /// Update still required iff `installed` is strictly older than the target
    pub fn is_update_required(&self, installed: &OsVersion) -> bool {
        installed.is_older_than(&self.target_version)
    }

    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.deadline <= now
    }

    pub fn target_major(&self) -> u64 {
        self.target_version.major()
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read install log {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Finds the enforcement in effect from the install log
#[derive(Debug, Clone)]
pub struct LogEnforcementExtractor {
    path: PathBuf,
}

impl LogEnforcementExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the log and extract the enforcement in effect.
    ///
    /// `Ok(None)` means no enforcement applies. Only an unreadable log is an
    /// error, so the caller can report it distinctly.
    pub fn extract(
        &self,
        installed: &OsVersion,
        now: DateTime<Local>,
    ) -> Result<Option<EnforcementRecord>, ExtractError> {
        debug!(path = %self.path.display(), "Reading install log");
        let bytes = std::fs::read(&self.path).map_err(|source| ExtractError::Unreadable {
            path: self.path.clone(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(extract_from_log(&content, installed, now))
    }
}

/// Extract the enforcement in effect from log text
pub fn extract_from_log(
    log: &str,
    installed: &OsVersion,
    now: DateTime<Local>,
) -> Option<EnforcementRecord> {
    let Some(line) = log.lines().rev().find(|l| l.contains(ENFORCEMENT_MARKER)) else {
        info!("No enforcement entry in install log");
        return None;
    };

    let record = parse_enforcement_line(line, installed, now)?;
    info!(
        target_version = %record.target_version,
        target_build = %record.target_build,
        deadline = %record.deadline,
        days_remaining = record.days_remaining,
        "Found enforcement"
    );

    if !record.is_due(now) {
        return Some(record);
    }

    debug!("Enforced deadline has passed, looking for a padded deadline");
    match find_padded_deadline(log) {
        Some(padded) => {
            info!(padded_deadline = %padded, "Using padded enforcement deadline");
            Some(record.with_padded_deadline(padded, now))
        }
        None => Some(record),
    }
}

fn parse_enforcement_line(
    line: &str,
    installed: &OsVersion,
    now: DateTime<Local>,
) -> Option<EnforcementRecord> {
    let Some(raw_deadline) = field_value(line, KEY_DEADLINE) else {
        warn!("Enforcement entry has no deadline value");
        return None;
    };
    let Some(version) = field_value(line, KEY_VERSION) else {
        warn!("Enforcement entry has no target version");
        return None;
    };
    let build = field_value(line, KEY_BUILD).unwrap_or_default();

    let Some(deadline) = parse_enforced_deadline(&raw_deadline) else {
        warn!(value = %raw_deadline, "Unparsable enforcement deadline");
        return None;
    };

    Some(EnforcementRecord::new(
        OsVersion::parse(&version),
        build,
        deadline,
        installed,
        now,
    ))
}

/// Value of a `|Key:value` token; runs to the next `|` or end of line.
fn field_value(line: &str, key: &str) -> Option<String> {
    let needle = format!("|{}:", key);
    let start = line.find(&needle)? + needle.len();
    let rest = &line[start..];
    let end = rest.find('|').unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse the enforced deadline: RFC 3339 (`...Z` or with an offset), or a
/// bare `YYYY-MM-DDTHH:MM:SS` read as local time.
pub fn parse_enforced_deadline(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, LOCAL_DEADLINE_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Parse a padded deadline such as `Thu Nov 13 08:59:56 2025` (local time)
pub fn parse_padded_deadline(raw: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), PADDED_DEADLINE_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Most recent parsable padded deadline in the log
fn find_padded_deadline(log: &str) -> Option<DateTime<Local>> {
    for line in log.lines().rev() {
        let Some(idx) = line.find(PADDED_DEADLINE_MARKER) else {
            continue;
        };
        let raw = &line[idx + PADDED_DEADLINE_MARKER.len()..];
        match parse_padded_deadline(raw) {
            Some(deadline) => return Some(deadline),
            None => warn!(value = raw.trim(), "Unparsable padded enforcement deadline"),
        }
    }
    None
}
