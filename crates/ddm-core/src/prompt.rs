//! Prompt rendering
//!
//! Turns the enforcement record, ledger counts and policy into a
//! [`PromptRequest`]. Every policy choice about the prompt (exhausted
//! behaviour, timer, blur) is made here; the presenter only maps fields to
//! its own flags.

use chrono::{DateTime, Local};
use ddm_api::{ExhaustedBehavior, PromptRequest};
use ddm_config::Policy;
use ddm_host_api::{ConsoleUser, DeviceInfo};
use ddm_util::OsVersion;
use std::collections::HashMap;

use crate::EnforcementRecord;

/// Everything known about this invocation that prompt text may refer to
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub record: &'a EnforcementRecord,
    pub installed: &'a OsVersion,

    /// Effective days remaining (the test override in test mode)
    pub days_remaining: i64,

    pub deferrals_remaining: u32,
    pub deferrals_used: u32,

    /// Budget at the current threshold
    pub max_deferrals: u32,

    pub user: &'a ConsoleUser,
    pub device: &'a DeviceInfo,
    pub now: DateTime<Local>,
}

impl PromptContext<'_> {
    pub fn is_exhausted(&self) -> bool {
        self.deferrals_remaining == 0
    }
}

/// Build the prompt for this invocation
pub fn render_prompt(policy: &Policy, ctx: &PromptContext<'_>) -> PromptRequest {
    let dialog = &policy.dialog;
    let deferral = &policy.deferral;
    let record = ctx.record;
    let exhausted = ctx.is_exhausted();
    let major = record.target_major();

    let vars = placeholder_values(policy, ctx);
    let render = |template: &str| substitute(template, &vars);

    let snooze_option_label = deferral
        .snooze_enabled
        .then(|| render(&dialog.snooze_button_text));

    let (button2_text, button2_disabled_text, auto_proceed_seconds) = if !exhausted {
        (Some(dialog.button2_text.clone()), None, None)
    } else {
        match deferral.exhausted_behavior {
            ExhaustedBehavior::NoRemindButton => {
                (None, Some(dialog.button2_text_exhausted.clone()), None)
            }
            ExhaustedBehavior::AutoOpenUpdate => {
                (None, None, Some(deferral.auto_open_delay_seconds))
            }
        }
    };

    PromptRequest {
        title: render(dialog.title_for(record.is_upgrade, major)),
        message: render(dialog.message_template_for(exhausted, major)),
        infobox: render(&dialog.infobox_template),
        help_message: render(&dialog.help_message_template),
        button1_text: dialog.button1_text.clone(),
        button2_text,
        button2_disabled_text,
        info_button_text: dialog.info_button_text.clone(),
        timer_seconds: (deferral.snooze_enabled && !exhausted)
            .then_some(deferral.dialog_timeout_seconds),
        auto_proceed_seconds,
        blur_screen: ctx.days_remaining <= policy.behavior.blurscreen_days,
        icon_major_version: major,
        window_width: dialog.window_width,
        window_height: dialog.window_height,
        window_position: dialog.window_position,
        defer_option_label: dialog.button2_text.clone(),
        snooze_option_label,
    }
}

fn placeholder_values(policy: &Policy, ctx: &PromptContext<'_>) -> HashMap<&'static str, String> {
    let record = ctx.record;
    let support = &policy.support;
    let action = if record.is_upgrade { "Upgrade" } else { "Update" };
    let software_update_button = if record.is_upgrade {
        "Upgrade Now"
    } else {
        "Restart Now"
    };

    HashMap::from([
        ("userFirstName", first_name(ctx.user)),
        ("userFullName", ctx.user.full_name.clone()),
        ("userName", ctx.user.username.clone()),
        ("computerName", ctx.device.computer_name.clone()),
        ("serialNumber", ctx.device.serial_number.clone()),
        ("installedVersion", ctx.installed.to_string()),
        ("targetVersion", record.target_version.to_string()),
        ("targetBuild", record.target_build.clone()),
        ("action", action.to_string()),
        ("actionLower", action.to_lowercase()),
        ("softwareUpdateButtonText", software_update_button.to_string()),
        ("deadlineFormatted", record.deadline_formatted.clone()),
        ("daysRemaining", ctx.days_remaining.max(0).to_string()),
        ("hoursRemaining", record.hours_remaining.max(0).to_string()),
        ("deferralsRemaining", ctx.deferrals_remaining.to_string()),
        ("deferralsUsed", ctx.deferrals_used.to_string()),
        ("maxDeferrals", ctx.max_deferrals.to_string()),
        ("dayOfWeek", ctx.now.format("%A").to_string()),
        ("currentDate", ctx.now.format("%Y-%m-%d").to_string()),
        ("currentTime", ctx.now.format("%H:%M").to_string()),
        ("button1Text", policy.dialog.button1_text.clone()),
        ("button2Text", policy.dialog.button2_text.clone()),
        ("supportTeamName", support.team_name.clone()),
        ("supportPhone", support.phone.clone()),
        ("supportEmail", support.email.clone()),
        ("supportWebsite", support.website.clone()),
        ("supportKBArticleID", support.kb_article_id.clone()),
        ("supportKBArticleURL", support.kb_article_url.clone()),
        ("snoozeMinutes", policy.deferral.snooze_minutes.to_string()),
    ])
}

/// Replace `{name}` placeholders in one pass.
///
/// Unknown placeholders are left as written, and substituted values are never
/// expanded again.
pub fn substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        match vars.get(&after[..close]) {
            Some(value) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Friendly first name: `"Doe, Jane"` and `"jane doe"` both give `Jane`.
///
/// Falls back to the account name when no full name is known.
pub fn first_name(user: &ConsoleUser) -> String {
    let full = user.full_name.trim();
    let name = match full.rsplit_once(',') {
        Some((_, first)) => first.trim(),
        None => full.split_whitespace().next().unwrap_or(""),
    };
    let name = if name.is_empty() {
        user.username.as_str()
    } else {
        name
    };

    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
