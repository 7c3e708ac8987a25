//! Run status and structured error codes for health reporting

use serde::{Deserialize, Serialize};

/// Structured codes for programmatic parsing by fleet monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ErrorCode {
    Success,

    ConfigMissing,
    ConfigInvalid,
    ConfigVersionMismatch,

    DialogNotInstalled,
    DialogVersionTooLow,
    DialogExecFailed,

    NoConsoleUser,
    LogParseError,
    NotRunningAsRoot,
    LedgerCorrupt,
    LedgerWriteFailed,

    UserOpenedUpdate,
    UserDeferred,
    UserSnoozed,
    UserViewedHelp,
    UserTimeout,
}

impl ErrorCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::Success => 0,
            Self::ConfigMissing => 100,
            Self::ConfigInvalid => 101,
            Self::ConfigVersionMismatch => 103,
            Self::DialogNotInstalled => 200,
            Self::DialogVersionTooLow => 201,
            Self::DialogExecFailed => 202,
            Self::NoConsoleUser => 400,
            Self::LogParseError => 401,
            Self::NotRunningAsRoot => 402,
            Self::LedgerCorrupt => 404,
            Self::LedgerWriteFailed => 405,
            Self::UserOpenedUpdate => 500,
            Self::UserDeferred => 501,
            Self::UserSnoozed => 502,
            Self::UserViewedHelp => 503,
            Self::UserTimeout => 504,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            0..=99 => ErrorCategory::Success,
            100..=199 => ErrorCategory::Configuration,
            200..=299 => ErrorCategory::Dialog,
            300..=399 => ErrorCategory::Network,
            400..=499 => ErrorCategory::System,
            500..=599 => ErrorCategory::UserAction,
            _ => ErrorCategory::Unknown,
        }
    }

    pub fn severity(&self) -> Severity {
        match self.category() {
            ErrorCategory::Success | ErrorCategory::UserAction => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        const ALL: [ErrorCode; 17] = [
            ErrorCode::Success,
            ErrorCode::ConfigMissing,
            ErrorCode::ConfigInvalid,
            ErrorCode::ConfigVersionMismatch,
            ErrorCode::DialogNotInstalled,
            ErrorCode::DialogVersionTooLow,
            ErrorCode::DialogExecFailed,
            ErrorCode::NoConsoleUser,
            ErrorCode::LogParseError,
            ErrorCode::NotRunningAsRoot,
            ErrorCode::LedgerCorrupt,
            ErrorCode::LedgerWriteFailed,
            ErrorCode::UserOpenedUpdate,
            ErrorCode::UserDeferred,
            ErrorCode::UserSnoozed,
            ErrorCode::UserViewedHelp,
            ErrorCode::UserTimeout,
        ];
        ALL.into_iter()
            .find(|c| c.code() == value)
            .ok_or_else(|| format!("unknown error code {}", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    Success,
    Configuration,
    Dialog,
    Network,
    System,
    UserAction,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Error,
}

/// Overall status of the last run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    ConfigMissing,
    ConfigError,
    DialogError,
    LogParseError,
    PreflightFailed,
    #[default]
    Unknown,
}

impl RunStatus {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Success | Self::Unknown => ErrorCode::Success,
            Self::ConfigMissing => ErrorCode::ConfigMissing,
            Self::ConfigError => ErrorCode::ConfigInvalid,
            Self::DialogError => ErrorCode::DialogExecFailed,
            Self::LogParseError => ErrorCode::LogParseError,
            Self::PreflightFailed => ErrorCode::NotRunningAsRoot,
        }
    }
}

/// Descriptive label of what happened in a run, shown in fleet reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserAction {
    #[default]
    None,
    NoEnforcement,
    UpToDate,
    OutsideWindow,
    Snoozed,
    MeetingTimeout,
    OpenedSoftwareUpdate,
    Deferred,
    SnoozedByTimeout,
    ViewedHelp,
    Timeout,
    Error,
}

impl UserAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::NoEnforcement => "No enforcement",
            Self::UpToDate => "Up to date",
            Self::OutsideWindow => "Outside window",
            Self::Snoozed => "Snoozed",
            Self::MeetingTimeout => "Meeting timeout - will retry later",
            Self::OpenedSoftwareUpdate => "Opened Software Update",
            Self::Deferred => "Deferred",
            Self::SnoozedByTimeout => "Snoozed (timeout)",
            Self::ViewedHelp => "Viewed help",
            Self::Timeout => "Timeout",
            Self::Error => "Error",
        }
    }

    /// User-action code, for the actions that came from a shown prompt
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::OpenedSoftwareUpdate => Some(ErrorCode::UserOpenedUpdate),
            Self::Deferred => Some(ErrorCode::UserDeferred),
            Self::SnoozedByTimeout => Some(ErrorCode::UserSnoozed),
            Self::ViewedHelp => Some(ErrorCode::UserViewedHelp),
            Self::Timeout => Some(ErrorCode::UserTimeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_code_ranges() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::Success);
        assert_eq!(ErrorCode::ConfigInvalid.category(), ErrorCategory::Configuration);
        assert_eq!(ErrorCode::DialogExecFailed.category(), ErrorCategory::Dialog);
        assert_eq!(ErrorCode::LogParseError.category(), ErrorCategory::System);
        assert_eq!(ErrorCode::LedgerWriteFailed.category(), ErrorCategory::System);
        assert_eq!(ErrorCode::UserDeferred.category(), ErrorCategory::UserAction);
    }

    #[test]
    fn user_actions_are_informational() {
        assert_eq!(ErrorCode::UserSnoozed.severity(), Severity::Info);
        assert_eq!(ErrorCode::Success.severity(), Severity::Info);
        assert_eq!(ErrorCode::DialogNotInstalled.severity(), Severity::Error);
    }

    #[test]
    fn code_serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::UserDeferred).unwrap();
        assert_eq!(json, "501");
        let parsed: ErrorCode = serde_json::from_str("202").unwrap();
        assert_eq!(parsed, ErrorCode::DialogExecFailed);
        assert!(serde_json::from_str::<ErrorCode>("999").is_err());
        let parsed: ErrorCode = serde_json::from_str("405").unwrap();
        assert_eq!(parsed, ErrorCode::LedgerWriteFailed);
    }
}
