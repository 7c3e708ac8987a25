//! Checks that must pass before a reminder run

use ddm_api::ErrorCode;
use ddm_host_api::{ConsoleUser, UserInfoProbe};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreflightError {
    #[error("Must be run as root")]
    NotRoot,

    #[error("No logged-in console user")]
    NoConsoleUser,
}

impl PreflightError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotRoot => ErrorCode::NotRunningAsRoot,
            Self::NoConsoleUser => ErrorCode::NoConsoleUser,
        }
    }
}

/// Verify privileges and that someone is at the console to be reminded.
///
/// `require_root` is false in debug and test runs.
pub fn preflight(
    users: &dyn UserInfoProbe,
    require_root: bool,
    is_root: bool,
) -> Result<ConsoleUser, PreflightError> {
    if require_root && !is_root {
        return Err(PreflightError::NotRoot);
    }
    debug!(require_root, is_root, "Privilege check passed");

    let user = match users.console_user() {
        Ok(Some(user)) if user.is_interactive() => user,
        Ok(_) => return Err(PreflightError::NoConsoleUser),
        Err(e) => {
            debug!(error = %e, "Console user lookup failed");
            return Err(PreflightError::NoConsoleUser);
        }
    };

    info!(user = %user.username, "Preflight checks passed");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddm_host_api::MockHost;

    #[test]
    fn root_required_unless_relaxed() {
        let host = MockHost::new();
        assert_eq!(preflight(&host, true, false), Err(PreflightError::NotRoot));
        assert!(preflight(&host, false, false).is_ok());
        assert_eq!(preflight(&host, true, true).unwrap().username, "jdoe");
    }

    #[test]
    fn login_window_is_not_a_user() {
        let host = MockHost::new().with_console_user(Some(ConsoleUser {
            username: "loginwindow".into(),
            full_name: String::new(),
        }));
        assert_eq!(preflight(&host, false, true), Err(PreflightError::NoConsoleUser));

        let nobody = MockHost::new().with_console_user(None);
        let err = preflight(&nobody, false, true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoConsoleUser);
    }
}
