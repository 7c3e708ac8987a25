//! Prompt outcomes and the dialog exit-code protocol

use serde::{Deserialize, Serialize};

/// Exit codes reported by the dialog binary
pub mod exit_code {
    pub const BUTTON1: i32 = 0;
    pub const BUTTON2: i32 = 2;
    pub const INFO_BUTTON: i32 = 3;
    pub const TIMER_EXPIRED: i32 = 4;
    pub const DO_NOT_DISTURB: i32 = 20;
}

/// Terminal result of showing a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PromptOutcome {
    /// User chose to open the OS update surface
    OpenUpdate,
    /// User spent one deferral
    Defer,
    /// User asked to be reminded later without spending a deferral
    Snooze,
    /// User opened the help content
    Info,
    /// Prompt dismissed itself (timer, do-not-disturb)
    Timeout,
    /// Collaborator failed; the invocation exits non-zero
    Error(String),
}

/// Optional JSON payload written by a combined defer/snooze selector
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorPayload {
    #[serde(rename = "SelectedOption")]
    pub selected_option: Option<String>,
}

impl SelectorPayload {
    /// Parse the selector payload from the dialog's stdout.
    ///
    /// Returns `None` for empty or non-JSON output.
    pub fn parse(stdout: &str) -> Option<Self> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

impl PromptOutcome {
    /// Decode a bare exit code.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            exit_code::BUTTON1 => Self::OpenUpdate,
            exit_code::BUTTON2 => Self::Defer,
            exit_code::INFO_BUTTON => Self::Info,
            exit_code::TIMER_EXPIRED | exit_code::DO_NOT_DISTURB => Self::Timeout,
            other => Self::Error(format!("Unknown exit code: {}", other)),
        }
    }

    /// Decode an exit code together with an optional selector payload.
    ///
    /// When a combined selector was shown, picking the snooze option turns
    /// button2 into a snooze. Every other exit code, button1 included,
    /// follows the exit code alone.
    pub fn decode(code: i32, payload: Option<&SelectorPayload>, snooze_label: &str) -> Self {
        let base = Self::from_exit_code(code);
        if base != Self::Defer {
            return base;
        }

        let Some(selected) = payload.and_then(|p| p.selected_option.as_deref()) else {
            return base;
        };

        if selected == snooze_label {
            Self::Snooze
        } else {
            base
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_mapping() {
        assert_eq!(PromptOutcome::from_exit_code(0), PromptOutcome::OpenUpdate);
        assert_eq!(PromptOutcome::from_exit_code(2), PromptOutcome::Defer);
        assert_eq!(PromptOutcome::from_exit_code(3), PromptOutcome::Info);
        assert_eq!(PromptOutcome::from_exit_code(4), PromptOutcome::Timeout);
        assert_eq!(PromptOutcome::from_exit_code(20), PromptOutcome::Timeout);
        assert!(PromptOutcome::from_exit_code(1).is_error());
        assert!(PromptOutcome::from_exit_code(-1).is_error());
    }

    #[test]
    fn selector_payload_picks_snooze() {
        let payload = SelectorPayload::parse(r#"{"SelectedOption": "Snooze 120 Minutes"}"#);
        let outcome = PromptOutcome::decode(2, payload.as_ref(), "Snooze 120 Minutes");
        assert_eq!(outcome, PromptOutcome::Snooze);
    }

    #[test]
    fn selector_payload_picks_defer() {
        let payload = SelectorPayload::parse(r#"{"SelectedOption": "Remind Me Later"}"#);
        let outcome = PromptOutcome::decode(2, payload.as_ref(), "Snooze 120 Minutes");
        assert_eq!(outcome, PromptOutcome::Defer);
    }

    #[test]
    fn open_update_ignores_selector_payload() {
        // The selector always reports its default option, even on button1
        for selected in ["Remind Me Later", "Snooze 120 Minutes"] {
            let stdout = format!(r#"{{"SelectedOption": "{selected}"}}"#);
            let payload = SelectorPayload::parse(&stdout);
            let outcome = PromptOutcome::decode(0, payload.as_ref(), "Snooze 120 Minutes");
            assert_eq!(outcome, PromptOutcome::OpenUpdate);
        }
    }

    #[test]
    fn selector_ignored_for_info_and_timeout() {
        let payload = SelectorPayload::parse(r#"{"SelectedOption": "Snooze 120 Minutes"}"#);
        assert_eq!(
            PromptOutcome::decode(3, payload.as_ref(), "Snooze 120 Minutes"),
            PromptOutcome::Info
        );
        assert_eq!(
            PromptOutcome::decode(4, payload.as_ref(), "Snooze 120 Minutes"),
            PromptOutcome::Timeout
        );
    }

    #[test]
    fn malformed_payload_is_ignored() {
        assert!(SelectorPayload::parse("").is_none());
        assert!(SelectorPayload::parse("not json").is_none());
        assert_eq!(PromptOutcome::decode(2, None, "Snooze"), PromptOutcome::Defer);
    }
}
