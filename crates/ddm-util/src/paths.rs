//! Default paths for ddm-reminder components
//!
//! The reminder runs as root from a system scheduler, so defaults live under
//! the machine-wide management directory:
//! - Config: `/Library/Application Support/<domain>/config.toml`
//! - State: `/Library/Application Support/<domain>/` (ledger, health snapshot)
//! - Install log: `/var/log/install.log`

use std::path::{Path, PathBuf};

use crate::PreferenceDomain;

/// Environment variable for overriding the config file path
pub const DDM_CONFIG_ENV: &str = "DDM_CONFIG";

/// Environment variable for overriding the state directory
pub const DDM_DATA_DIR_ENV: &str = "DDM_DATA_DIR";

/// Default machine-wide management directory
pub const DEFAULT_MANAGEMENT_DIR: &str = "/Library/Application Support";

/// Default location of the system install log
pub const DEFAULT_INSTALL_LOG: &str = "/var/log/install.log";

/// Ledger filename within the state directory
pub const LEDGER_FILENAME: &str = "deferral.json";

/// Config filename within the state directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the state directory for a preference domain.
///
/// Order of precedence:
/// 1. `$DDM_DATA_DIR` environment variable (if set)
/// 2. `<management_dir>/<domain>`
pub fn default_state_dir(management_dir: &Path, domain: &PreferenceDomain) -> PathBuf {
    if let Ok(path) = std::env::var(DDM_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    state_dir_without_env(management_dir, domain)
}

/// Get the state directory without checking the `DDM_DATA_DIR` env var.
pub fn state_dir_without_env(management_dir: &Path, domain: &PreferenceDomain) -> PathBuf {
    management_dir.join(domain.as_str())
}

/// Get the default config path for a preference domain.
///
/// Order of precedence:
/// 1. `$DDM_CONFIG` environment variable (if set)
/// 2. `/Library/Application Support/<domain>/config.toml`
pub fn default_config_path(domain: &PreferenceDomain) -> PathBuf {
    if let Ok(path) = std::env::var(DDM_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_MANAGEMENT_DIR)
        .join(domain.as_str())
        .join(CONFIG_FILENAME)
}

/// Path of the deferral ledger inside a state directory
pub fn ledger_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LEDGER_FILENAME)
}
