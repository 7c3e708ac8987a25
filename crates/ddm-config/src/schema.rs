//! Raw configuration schema (as parsed from TOML)
//!
//! Every field is optional; defaults and bounds are applied when the raw
//! config is turned into a [`crate::Policy`]. Integers are signed here so
//! out-of-range values can be clamped with a warning instead of failing the
//! parse.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub organization: RawOrganization,

    #[serde(default)]
    pub behavior: RawBehavior,

    #[serde(default)]
    pub deferral: RawDeferral,

    #[serde(default)]
    pub schedule: RawSchedule,

    #[serde(default)]
    pub dialog: RawDialog,

    #[serde(default)]
    pub support: RawSupport,

    #[serde(default)]
    pub health: RawHealth,

    #[serde(default)]
    pub advanced: RawAdvanced,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawOrganization {
    /// Reverse-DNS domain, also the name of the state directory
    pub domain: Option<String>,
    pub name: Option<String>,
    pub management_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBehavior {
    pub days_before_deadline_display_reminder: Option<i64>,
    pub days_before_deadline_blurscreen: Option<i64>,
    pub meeting_delay_minutes: Option<i64>,
    pub meeting_check_interval_seconds: Option<i64>,
    pub ignore_assertions_within_hours: Option<i64>,
    pub random_delay_max_seconds: Option<i64>,
    pub schedule_tolerance_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDeferralThreshold {
    pub days_remaining: i64,
    pub max_deferrals: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDeferral {
    pub max_deferrals: Option<i64>,

    /// Threshold table, in any order
    #[serde(default)]
    pub schedule: Vec<RawDeferralThreshold>,

    pub reset_on_new_deadline: Option<bool>,
    pub snooze_enabled: Option<bool>,
    pub snooze_minutes: Option<i64>,

    /// "no_remind_button" or "auto_open_update"
    pub exhausted_behavior: Option<String>,

    pub auto_open_delay_seconds: Option<i64>,
    pub dialog_timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Scheduler launch times, "HH:MM"
    #[serde(default)]
    pub times: Vec<String>,

    pub login_delay_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVersionOverride {
    pub title: Option<String>,
    pub message_template: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDialog {
    pub title_update: Option<String>,
    pub title_upgrade: Option<String>,
    pub button1_text: Option<String>,
    pub button2_text: Option<String>,
    pub button2_text_exhausted: Option<String>,
    pub snooze_button_text: Option<String>,
    pub info_button_text: Option<String>,
    pub message_template: Option<String>,
    pub message_template_exhausted: Option<String>,
    pub infobox_template: Option<String>,
    pub help_message_template: Option<String>,

    /// Keyed by target major version ("15", "26")
    #[serde(default)]
    pub per_version: HashMap<String, RawVersionOverride>,

    pub window_width: Option<i64>,
    pub window_height: Option<i64>,
    pub window_position: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSupport {
    pub team_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub kb_article_id: Option<String>,
    pub kb_article_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHealth {
    pub enabled: Option<bool>,

    /// Relative to the state directory unless absolute
    pub state_file: Option<PathBuf>,

    pub max_error_entries: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAdvanced {
    pub dialog_binary: Option<PathBuf>,
    pub dialog_min_version: Option<String>,
    pub verbose_logging: Option<bool>,
    pub test_mode: Option<bool>,
    pub test_days_remaining: Option<i64>,
    pub install_log: Option<PathBuf>,
}
