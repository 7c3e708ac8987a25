//! Health snapshot consumed by fleet monitoring

use chrono::{DateTime, Local};
use ddm_api::{ErrorCategory, ErrorCode, HEALTH_SCHEMA_VERSION, RunStatus, Severity, UserAction};
use ddm_util::RunId;
use serde::{Deserialize, Serialize};

/// One structured entry in the bounded error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Local>,
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: String,
}

/// State of the most recent run, rewritten at the end of every invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub schema_version: u32,
    pub last_run: Option<DateTime<Local>>,
    pub run_id: Option<RunId>,
    pub last_run_status: RunStatus,
    pub last_error_code: ErrorCode,
    pub last_error_category: ErrorCategory,
    pub config_version: u32,
    pub binary_version: String,
    pub current_deadline: Option<DateTime<Local>>,
    pub target_version: Option<String>,
    pub deferrals_remaining: Option<u32>,
    pub max_deferrals_at_threshold: Option<u32>,
    pub deferrals_used: Option<u32>,
    pub last_user_action: UserAction,

    /// Times the ledger was found damaged and reset to empty
    #[serde(default)]
    pub ledger_corruption_count: u32,

    #[serde(default)]
    pub error_log: Vec<ErrorLogEntry>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            schema_version: HEALTH_SCHEMA_VERSION,
            last_run: None,
            run_id: None,
            last_run_status: RunStatus::Unknown,
            last_error_code: ErrorCode::Success,
            last_error_category: ErrorCategory::Success,
            config_version: 0,
            binary_version: String::new(),
            current_deadline: None,
            target_version: None,
            deferrals_remaining: None,
            max_deferrals_at_threshold: None,
            deferrals_used: None,
            last_user_action: UserAction::None,
            ledger_corruption_count: 0,
            error_log: Vec::new(),
        }
    }
}

impl HealthSnapshot {
    /// Stamp the start of a run. Counters and the error log carry over.
    pub fn begin_run(
        &mut self,
        now: DateTime<Local>,
        run_id: RunId,
        config_version: u32,
        binary_version: impl Into<String>,
    ) {
        self.schema_version = HEALTH_SCHEMA_VERSION;
        self.last_run = Some(now);
        self.run_id = Some(run_id);
        self.config_version = config_version;
        self.binary_version = binary_version.into();
    }

    /// Record the terminal status. An explicit code wins over the status default.
    pub fn record_status(&mut self, status: RunStatus, code: Option<ErrorCode>) {
        let code = code.unwrap_or_else(|| status.error_code());
        self.last_run_status = status;
        self.last_error_code = code;
        self.last_error_category = code.category();
    }

    /// Append to the error log, keeping only the newest `max_entries`
    pub fn record_error(
        &mut self,
        now: DateTime<Local>,
        code: ErrorCode,
        message: impl Into<String>,
        max_entries: usize,
    ) {
        self.error_log.push(ErrorLogEntry {
            timestamp: now,
            code,
            category: code.category(),
            severity: code.severity(),
            message: message.into(),
        });
        if self.error_log.len() > max_entries {
            let excess = self.error_log.len() - max_entries;
            self.error_log.drain(..excess);
        }
    }
}
