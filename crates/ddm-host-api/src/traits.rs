//! Host capability traits

use ddm_api::{PromptOutcome, PromptRequest};
use ddm_util::OsVersion;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from host capability calls
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unparsable output: {0}")]
    Parse(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HostError {
    pub fn command_failed(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            detail: detail.into(),
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Logged-in console user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleUser {
    pub username: String,
    pub full_name: String,
}

impl ConsoleUser {
    /// Whether this looks like a real user session rather than the login screen
    pub fn is_interactive(&self) -> bool {
        !self.username.is_empty() && self.username != "loginwindow" && self.username != "root"
    }
}

/// Identity of the device, used only for prompt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub computer_name: String,
    pub serial_number: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            computer_name: "Unknown".into(),
            serial_number: "Unknown".into(),
        }
    }
}

/// Reports the currently installed OS version
pub trait VersionProbe {
    fn installed_version(&self) -> HostResult<OsVersion>;
}

/// Reports whether a presentation / do-not-disturb style display assertion
/// is currently held (video call, screen sharing, full-screen presentation)
pub trait AssertionProbe {
    fn display_assertion_active(&self) -> HostResult<bool>;
}

/// Console user and device identity
pub trait UserInfoProbe {
    /// The user owning the console, or `None` when nobody is logged in
    fn console_user(&self) -> HostResult<Option<ConsoleUser>>;

    fn device_info(&self) -> HostResult<DeviceInfo>;
}

/// Shows a rendered prompt and reports what the user did.
///
/// Collaborator failures (binary missing, too old, unexpected exit) are
/// reported as [`PromptOutcome::Error`], never as a panic.
pub trait PromptPresenter {
    fn present(&self, request: &PromptRequest) -> PromptOutcome;
}

/// Opens the OS software update surface
pub trait UpdateSurface {
    fn open_software_update(&self) -> HostResult<()>;
}

/// Blocks the invocation; injected so waits are observable in tests
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_window_is_not_interactive() {
        let user = ConsoleUser {
            username: "loginwindow".into(),
            full_name: String::new(),
        };
        assert!(!user.is_interactive());

        let user = ConsoleUser {
            username: "jdoe".into(),
            full_name: "Jane Doe".into(),
        };
        assert!(user.is_interactive());
    }

    #[test]
    fn host_error_display() {
        let err = HostError::command_failed("/usr/bin/sw_vers", "exit status 1");
        assert_eq!(
            err.to_string(),
            "Command `/usr/bin/sw_vers` failed: exit status 1"
        );
    }
}
