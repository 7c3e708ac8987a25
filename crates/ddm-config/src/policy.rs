//! Validated policy structures

use crate::schema::{
    RawAdvanced, RawBehavior, RawConfig, RawDeferral, RawDialog, RawHealth, RawOrganization,
    RawSchedule, RawSupport,
};
use crate::validation::{clamp_setting, parse_time};
use ddm_api::{ExhaustedBehavior, WindowPosition};
use ddm_util::{
    DEFAULT_INSTALL_LOG, DEFAULT_MANAGEMENT_DIR, OsVersion, PreferenceDomain, WallClock,
    default_state_dir,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone)]
pub struct Policy {
    pub organization: OrganizationPolicy,
    pub behavior: BehaviorPolicy,
    pub deferral: DeferralPolicy,
    pub schedule: SchedulePolicy,
    pub dialog: DialogContent,
    pub support: SupportInfo,
    pub health: HealthPolicy,
    pub advanced: AdvancedPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            organization: OrganizationPolicy::from_raw(raw.organization),
            behavior: BehaviorPolicy::from_raw(raw.behavior),
            deferral: DeferralPolicy::from_raw(raw.deferral),
            schedule: SchedulePolicy::from_raw(raw.schedule),
            dialog: DialogContent::from_raw(raw.dialog),
            support: SupportInfo::from_raw(raw.support),
            health: HealthPolicy::from_raw(raw.health),
            advanced: AdvancedPolicy::from_raw(raw.advanced),
        }
    }

    /// Directory holding the ledger and the health snapshot
    pub fn state_dir(&self) -> PathBuf {
        default_state_dir(
            &self.organization.management_dir,
            &self.organization.domain,
        )
    }

    /// Resolved health snapshot path
    pub fn health_path(&self) -> PathBuf {
        if self.health.state_file.is_absolute() {
            self.health.state_file.clone()
        } else {
            self.state_dir().join(&self.health.state_file)
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone)]
pub struct OrganizationPolicy {
    pub domain: PreferenceDomain,
    pub name: String,
    pub management_dir: PathBuf,
}

impl OrganizationPolicy {
    fn from_raw(raw: RawOrganization) -> Self {
        Self {
            domain: raw
                .domain
                .as_deref()
                .and_then(PreferenceDomain::parse)
                .unwrap_or_default(),
            name: raw.name.unwrap_or_else(|| "Your Organization".into()),
            management_dir: raw
                .management_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANAGEMENT_DIR)),
        }
    }
}

/// When and how insistently to remind
#[derive(Debug, Clone)]
pub struct BehaviorPolicy {
    /// Prompts are only shown when the deadline is at most this many days away
    pub display_reminder_days: i64,

    /// Blur the screen behind the prompt at or below this many days
    pub blurscreen_days: i64,

    /// Maximum total wait for a display assertion to clear
    pub meeting_delay: Duration,

    pub meeting_check_interval: Duration,

    /// Within this many hours of the deadline, meetings no longer delay prompts
    pub ignore_assertions_within_hours: i64,

    /// Upper bound of the anti-stampede jitter at scheduled launch times
    pub random_delay_max: Duration,

    /// How close to a scheduled time counts as a scheduled launch
    pub schedule_tolerance_minutes: u32,
}

impl BehaviorPolicy {
    fn from_raw(raw: RawBehavior) -> Self {
        Self {
            display_reminder_days: clamp_setting(
                raw.days_before_deadline_display_reminder,
                14,
                1,
                30,
                "behavior.days_before_deadline_display_reminder",
            ),
            blurscreen_days: clamp_setting(
                raw.days_before_deadline_blurscreen,
                3,
                0,
                14,
                "behavior.days_before_deadline_blurscreen",
            ),
            meeting_delay: minutes(clamp_setting(
                raw.meeting_delay_minutes,
                75,
                0,
                240,
                "behavior.meeting_delay_minutes",
            )),
            meeting_check_interval: seconds(clamp_setting(
                raw.meeting_check_interval_seconds,
                300,
                60,
                600,
                "behavior.meeting_check_interval_seconds",
            )),
            ignore_assertions_within_hours: clamp_setting(
                raw.ignore_assertions_within_hours,
                24,
                0,
                72,
                "behavior.ignore_assertions_within_hours",
            ),
            random_delay_max: seconds(clamp_setting(
                raw.random_delay_max_seconds,
                1200,
                0,
                3600,
                "behavior.random_delay_max_seconds",
            )),
            schedule_tolerance_minutes: clamp_setting(
                raw.schedule_tolerance_minutes,
                5,
                0,
                30,
                "behavior.schedule_tolerance_minutes",
            ) as u32,
        }
    }
}

impl Default for BehaviorPolicy {
    fn default() -> Self {
        Self::from_raw(RawBehavior::default())
    }
}

/// One row of the deferral threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferralThreshold {
    pub days_remaining: i64,
    pub max_deferrals: u32,
}

impl DeferralThreshold {
    pub const fn new(days_remaining: i64, max_deferrals: u32) -> Self {
        Self {
            days_remaining,
            max_deferrals,
        }
    }
}

/// Built-in threshold table
pub const DEFAULT_DEFERRAL_SCHEDULE: [DeferralThreshold; 4] = [
    DeferralThreshold::new(14, 10),
    DeferralThreshold::new(7, 5),
    DeferralThreshold::new(3, 2),
    DeferralThreshold::new(1, 0),
];

#[derive(Debug, Clone)]
pub struct DeferralPolicy {
    /// Fallback budget when the deadline is further away than every threshold
    pub max_deferrals: u32,

    /// Sorted ascending by `days_remaining`
    schedule: Vec<DeferralThreshold>,

    pub reset_on_new_deadline: bool,
    pub snooze_enabled: bool,
    pub snooze_minutes: u32,
    pub exhausted_behavior: ExhaustedBehavior,
    pub auto_open_delay_seconds: u64,

    /// Auto-dismiss timer on the prompt
    pub dialog_timeout_seconds: u64,
}

impl DeferralPolicy {
    /// Build a policy from a threshold table given in any order
    pub fn new(max_deferrals: u32, schedule: impl IntoIterator<Item = DeferralThreshold>) -> Self {
        let mut schedule: Vec<_> = schedule.into_iter().collect();
        schedule.sort_by_key(|t| t.days_remaining);
        Self {
            max_deferrals,
            schedule,
            ..Self::default()
        }
    }

    fn from_raw(raw: RawDeferral) -> Self {
        let schedule: Vec<DeferralThreshold> = if raw.schedule.is_empty() {
            DEFAULT_DEFERRAL_SCHEDULE.to_vec()
        } else {
            raw.schedule
                .iter()
                .map(|t| {
                    let max = clamp_setting(
                        Some(t.max_deferrals),
                        10,
                        0,
                        50,
                        "deferral.schedule.max_deferrals",
                    );
                    DeferralThreshold::new(t.days_remaining, max as u32)
                })
                .collect()
        };

        let exhausted_behavior = match raw.exhausted_behavior.as_deref() {
            None => ExhaustedBehavior::default(),
            Some(value) => ExhaustedBehavior::parse(value).unwrap_or_else(|| {
                warn!(
                    value,
                    "Invalid deferral.exhausted_behavior, using no_remind_button"
                );
                ExhaustedBehavior::NoRemindButton
            }),
        };

        let max_deferrals =
            clamp_setting(raw.max_deferrals, 10, 0, 50, "deferral.max_deferrals") as u32;

        let mut policy = Self::new(max_deferrals, schedule);
        policy.reset_on_new_deadline = raw.reset_on_new_deadline.unwrap_or(true);
        policy.snooze_enabled = raw.snooze_enabled.unwrap_or(true);
        policy.snooze_minutes =
            clamp_setting(raw.snooze_minutes, 120, 15, 480, "deferral.snooze_minutes") as u32;
        policy.exhausted_behavior = exhausted_behavior;
        policy.auto_open_delay_seconds = clamp_setting(
            raw.auto_open_delay_seconds,
            60,
            10,
            300,
            "deferral.auto_open_delay_seconds",
        ) as u64;
        policy.dialog_timeout_seconds = clamp_setting(
            raw.dialog_timeout_seconds,
            300,
            30,
            3600,
            "deferral.dialog_timeout_seconds",
        ) as u64;
        policy
    }

    pub fn schedule(&self) -> &[DeferralThreshold] {
        &self.schedule
    }

    /// Deferral budget for the given days remaining.
    ///
    /// The first threshold (ascending) that is `>= days_remaining` wins; if
    /// the deadline is further out than every threshold, `max_deferrals`.
    pub fn max_allowed(&self, days_remaining: i64) -> u32 {
        self.schedule
            .iter()
            .find(|t| t.days_remaining >= days_remaining)
            .map(|t| t.max_deferrals)
            .unwrap_or(self.max_deferrals)
    }
}

impl Default for DeferralPolicy {
    fn default() -> Self {
        Self {
            max_deferrals: 10,
            schedule: DEFAULT_DEFERRAL_SCHEDULE.to_vec(),
            reset_on_new_deadline: true,
            snooze_enabled: true,
            snooze_minutes: 120,
            exhausted_behavior: ExhaustedBehavior::NoRemindButton,
            auto_open_delay_seconds: 60,
            dialog_timeout_seconds: 300,
        }
    }
}

/// Scheduler launch times and login delay
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    /// Sorted, deduplicated
    pub times: Vec<WallClock>,
    pub login_delay: Duration,
}

impl SchedulePolicy {
    fn from_raw(raw: RawSchedule) -> Self {
        let mut times: Vec<WallClock> = raw
            .times
            .iter()
            .filter_map(|t| parse_time(t).ok())
            .collect();
        if times.is_empty() {
            times = default_schedule_times();
        }
        times.sort();
        times.dedup();

        Self {
            times,
            login_delay: seconds(clamp_setting(
                raw.login_delay_seconds,
                60,
                0,
                300,
                "schedule.login_delay_seconds",
            )),
        }
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::from_raw(RawSchedule::default())
    }
}

fn default_schedule_times() -> Vec<WallClock> {
    vec![WallClock::clamped(9, 0), WallClock::clamped(14, 0)]
}

/// Per-major-version text overrides
#[derive(Debug, Clone, Default)]
pub struct VersionOverride {
    pub title: Option<String>,
    pub message_template: Option<String>,
}

/// Prompt text templates and window geometry
#[derive(Debug, Clone)]
pub struct DialogContent {
    pub title_update: String,
    pub title_upgrade: String,
    pub button1_text: String,
    pub button2_text: String,
    pub button2_text_exhausted: String,
    pub snooze_button_text: String,
    pub info_button_text: String,

    pub message_template: String,
    pub message_template_exhausted: String,
    pub infobox_template: String,
    pub help_message_template: String,
    pub per_version: HashMap<u64, VersionOverride>,
    pub window_width: u32,
    pub window_height: u32,
    pub window_position: WindowPosition,
}

impl DialogContent {
    fn from_raw(raw: RawDialog) -> Self {
        let window_position = match raw.window_position.as_deref() {
            None => WindowPosition::default(),
            Some(value) => WindowPosition::parse(value).unwrap_or_else(|| {
                warn!(value, "Invalid dialog.window_position, using center");
                WindowPosition::Center
            }),
        };

        let mut per_version = HashMap::new();
        for (major, over) in raw.per_version {
            match major.trim().parse::<u64>() {
                Ok(m) => {
                    per_version.insert(
                        m,
                        VersionOverride {
                            title: over.title,
                            message_template: over.message_template,
                        },
                    );
                }
                Err(_) => warn!(key = %major, "Ignoring per-version override with non-numeric key"),
            }
        }

        Self {
            title_update: raw
                .title_update
                .unwrap_or_else(|| "macOS Update Required".into()),
            title_upgrade: raw
                .title_upgrade
                .unwrap_or_else(|| "macOS Upgrade Required".into()),
            button1_text: raw
                .button1_text
                .unwrap_or_else(|| "Open Software Update".into()),
            button2_text: raw.button2_text.unwrap_or_else(|| "Remind Me Later".into()),
            button2_text_exhausted: raw
                .button2_text_exhausted
                .unwrap_or_else(|| "No Deferrals Remaining".into()),
            snooze_button_text: raw
                .snooze_button_text
                .unwrap_or_else(|| "Snooze {snoozeMinutes} Minutes".into()),
            info_button_text: raw.info_button_text.unwrap_or_else(|| "Help".into()),
            message_template: raw
                .message_template
                .unwrap_or_else(|| DEFAULT_MESSAGE_TEMPLATE.into()),
            message_template_exhausted: raw
                .message_template_exhausted
                .unwrap_or_else(|| DEFAULT_EXHAUSTED_TEMPLATE.into()),
            infobox_template: raw
                .infobox_template
                .unwrap_or_else(|| DEFAULT_INFOBOX_TEMPLATE.into()),
            help_message_template: raw
                .help_message_template
                .unwrap_or_else(|| DEFAULT_HELP_TEMPLATE.into()),
            per_version,
            window_width: clamp_setting(raw.window_width, 800, 400, 1200, "dialog.window_width")
                as u32,
            window_height: clamp_setting(raw.window_height, 600, 300, 900, "dialog.window_height")
                as u32,
            window_position,
        }
    }

    /// Title for the target, honouring per-version overrides
    pub fn title_for(&self, is_upgrade: bool, target_major: u64) -> &str {
        if let Some(title) = self
            .per_version
            .get(&target_major)
            .and_then(|o| o.title.as_deref())
        {
            return title;
        }
        if is_upgrade {
            &self.title_upgrade
        } else {
            &self.title_update
        }
    }

    /// Message template for the target; exhausted prompts never use overrides
    pub fn message_template_for(&self, exhausted: bool, target_major: u64) -> &str {
        if exhausted {
            return &self.message_template_exhausted;
        }
        self.per_version
            .get(&target_major)
            .and_then(|o| o.message_template.as_deref())
            .unwrap_or(&self.message_template)
    }
}

impl Default for DialogContent {
    fn default() -> Self {
        Self::from_raw(RawDialog::default())
    }
}

const DEFAULT_MESSAGE_TEMPLATE: &str = "\
**A required macOS {actionLower} is available**
---
Happy {dayOfWeek}, {userFirstName}!

Please {actionLower} to macOS **{targetVersion}** to keep your Mac secure and compliant.

To {actionLower} now, click **{button1Text}** and then **{softwareUpdateButtonText}**.

If now is not a good time, click **{button2Text}** to be reminded later.

Your Mac **will restart and {actionLower} automatically** on **{deadlineFormatted}** if the {actionLower} has not been completed by then.

**Deferrals remaining:** {deferralsRemaining} of {maxDeferrals}

Need help? Contact **{supportTeamName}**.";

const DEFAULT_EXHAUSTED_TEMPLATE: &str = "\
**Action required now**
---
{userFirstName}, all deferrals for this {actionLower} have been used.

Your Mac must {actionLower} to macOS **{targetVersion}**.

Click **{button1Text}** to start.

Otherwise your Mac will restart and {actionLower} automatically on **{deadlineFormatted}**.

Need help? Contact **{supportTeamName}**.";

const DEFAULT_INFOBOX_TEMPLATE: &str = "\
**Current:** {installedVersion}

**Required:** {targetVersion}

**Deadline:** {deadlineFormatted}

**Days remaining:** {daysRemaining}";

const DEFAULT_HELP_TEMPLATE: &str = "\
Contact **{supportTeamName}**
- **Phone:** {supportPhone}
- **Email:** {supportEmail}
- **Website:** {supportWebsite}
- **KB article:** {supportKBArticleID}

**User:** {userFullName} ({userName})

**Computer:** {computerName}, serial {serialNumber}, macOS {installedVersion}";

/// Support contact details substituted into prompt text
#[derive(Debug, Clone, Default)]
pub struct SupportInfo {
    pub team_name: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub kb_article_id: String,
    pub kb_article_url: String,
}

impl SupportInfo {
    fn from_raw(raw: RawSupport) -> Self {
        Self {
            team_name: raw.team_name.unwrap_or_else(|| "IT Support".into()),
            phone: raw.phone.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            website: raw.website.unwrap_or_default(),
            kb_article_id: raw.kb_article_id.unwrap_or_default(),
            kb_article_url: raw.kb_article_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthPolicy {
    pub enabled: bool,
    pub state_file: PathBuf,
    pub max_error_entries: usize,
}

impl HealthPolicy {
    fn from_raw(raw: RawHealth) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            state_file: raw
                .state_file
                .unwrap_or_else(|| PathBuf::from("health.json")),
            max_error_entries: clamp_setting(
                raw.max_error_entries,
                50,
                10,
                200,
                "health.max_error_entries",
            ) as usize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdvancedPolicy {
    pub dialog_binary: PathBuf,
    pub dialog_min_version: OsVersion,
    pub verbose_logging: bool,

    /// Bypass the version check and window, use `test_days_remaining`
    pub test_mode: bool,
    pub test_days_remaining: i64,

    pub install_log: PathBuf,
}

impl AdvancedPolicy {
    fn from_raw(raw: RawAdvanced) -> Self {
        Self {
            dialog_binary: raw
                .dialog_binary
                .unwrap_or_else(|| PathBuf::from("/usr/local/bin/dialog")),
            dialog_min_version: OsVersion::parse(
                raw.dialog_min_version.as_deref().unwrap_or("2.4.0"),
            ),
            verbose_logging: raw.verbose_logging.unwrap_or(false),
            test_mode: raw.test_mode.unwrap_or(false),
            test_days_remaining: clamp_setting(
                raw.test_days_remaining,
                5,
                0,
                30,
                "advanced.test_days_remaining",
            ),
            install_log: raw
                .install_log
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_LOG)),
        }
    }
}

impl Default for AdvancedPolicy {
    fn default() -> Self {
        Self::from_raw(RawAdvanced::default())
    }
}

fn seconds(value: i64) -> Duration {
    Duration::from_secs(value.max(0) as u64)
}

fn minutes(value: i64) -> Duration {
    Duration::from_secs(value.max(0) as u64 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawDeferralThreshold;

    fn standard_policy() -> DeferralPolicy {
        DeferralPolicy::new(
            10,
            [
                DeferralThreshold::new(14, 10),
                DeferralThreshold::new(7, 5),
                DeferralThreshold::new(3, 2),
                DeferralThreshold::new(1, 0),
            ],
        )
    }

    #[test]
    fn max_allowed_table() {
        let policy = standard_policy();
        assert_eq!(policy.max_allowed(20), 10);
        assert_eq!(policy.max_allowed(14), 10);
        assert_eq!(policy.max_allowed(10), 10);
        assert_eq!(policy.max_allowed(7), 5);
        assert_eq!(policy.max_allowed(5), 5);
        assert_eq!(policy.max_allowed(3), 2);
        assert_eq!(policy.max_allowed(1), 0);
        assert_eq!(policy.max_allowed(0), 0);
    }

    #[test]
    fn schedule_order_does_not_matter() {
        let shuffled = DeferralPolicy::new(
            10,
            [
                DeferralThreshold::new(3, 2),
                DeferralThreshold::new(14, 10),
                DeferralThreshold::new(1, 0),
                DeferralThreshold::new(7, 5),
            ],
        );
        let sorted = standard_policy();
        for days in -2..25 {
            assert_eq!(shuffled.max_allowed(days), sorted.max_allowed(days), "days={days}");
        }
    }

    #[test]
    fn fewer_days_never_allow_more_deferrals() {
        let policy = standard_policy();
        for days in 0..30 {
            assert!(policy.max_allowed(days) <= policy.max_allowed(days + 1));
        }
    }

    #[test]
    fn fallback_is_used_beyond_last_threshold() {
        let policy = DeferralPolicy::new(3, [DeferralThreshold::new(7, 5)]);
        assert_eq!(policy.max_allowed(8), 3);
        assert_eq!(policy.max_allowed(7), 5);
    }

    #[test]
    fn oversized_threshold_budget_is_clamped() {
        let raw = RawDeferral {
            schedule: vec![
                RawDeferralThreshold {
                    days_remaining: 7,
                    max_deferrals: 4_294_967_297,
                },
                RawDeferralThreshold {
                    days_remaining: 3,
                    max_deferrals: 2,
                },
            ],
            ..Default::default()
        };
        let policy = DeferralPolicy::from_raw(raw);
        assert_eq!(policy.max_allowed(7), 50);
        assert_eq!(policy.max_allowed(3), 2);
    }

    #[test]
    fn invalid_enums_fall_back() {
        let raw = RawDeferral {
            exhausted_behavior: Some("InvalidBehavior".into()),
            ..Default::default()
        };
        let policy = DeferralPolicy::from_raw(raw);
        assert_eq!(policy.exhausted_behavior, ExhaustedBehavior::NoRemindButton);

        let raw = RawDialog {
            window_position: Some("middle".into()),
            ..Default::default()
        };
        let dialog = DialogContent::from_raw(raw);
        assert_eq!(dialog.window_position, WindowPosition::Center);
    }

    #[test]
    fn defaults_are_clamped_values() {
        let policy = Policy::default();
        assert_eq!(policy.behavior.display_reminder_days, 14);
        assert_eq!(policy.behavior.meeting_delay, Duration::from_secs(75 * 60));
        assert_eq!(policy.behavior.schedule_tolerance_minutes, 5);
        assert_eq!(policy.deferral.snooze_minutes, 120);
        assert_eq!(policy.deferral.dialog_timeout_seconds, 300);
        assert_eq!(policy.schedule.times.len(), 2);
        assert_eq!(policy.health.max_error_entries, 50);
        assert_eq!(policy.advanced.dialog_min_version, OsVersion::parse("2.4.0"));
        assert_eq!(policy.organization.domain, PreferenceDomain::default());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let raw = RawBehavior {
            days_before_deadline_display_reminder: Some(90),
            meeting_check_interval_seconds: Some(5),
            ..Default::default()
        };
        let behavior = BehaviorPolicy::from_raw(raw);
        assert_eq!(behavior.display_reminder_days, 30);
        assert_eq!(behavior.meeting_check_interval, Duration::from_secs(60));
    }

    #[test]
    fn per_version_overrides() {
        let mut raw = RawDialog::default();
        raw.per_version.insert(
            "26".into(),
            crate::schema::RawVersionOverride {
                title: Some("Welcome to 26".into()),
                message_template: Some("Upgrade to {targetVersion}".into()),
            },
        );
        let dialog = DialogContent::from_raw(raw);
        assert_eq!(dialog.title_for(true, 26), "Welcome to 26");
        assert_eq!(dialog.title_for(true, 15), "macOS Upgrade Required");
        assert_eq!(dialog.title_for(false, 15), "macOS Update Required");
        assert_eq!(dialog.message_template_for(false, 26), "Upgrade to {targetVersion}");
        assert_eq!(
            dialog.message_template_for(true, 26),
            dialog.message_template_exhausted
        );
    }

    #[test]
    fn health_path_resolution() {
        let mut policy = Policy::default();
        policy.organization.management_dir = PathBuf::from("/tmp/mgmt");
        if std::env::var(ddm_util::DDM_DATA_DIR_ENV).is_err() {
            assert_eq!(
                policy.health_path(),
                PathBuf::from("/tmp/mgmt/com.example.ddmreminder/health.json")
            );
        }
        policy.health.state_file = PathBuf::from("/var/tmp/health.json");
        assert_eq!(policy.health_path(), PathBuf::from("/var/tmp/health.json"));
    }
}
