//! Per-invocation decision procedure
//!
//! One scheduler invocation runs [`ReminderDecisionProcedure::run`] once:
//! extract the enforcement, check version and window, observe the deadline in
//! the ledger, honour snooze and meetings, apply the startup delay, prompt, and
//! apply the outcome.

use chrono::{DateTime, Local};
use ddm_api::{RunStatus, UserAction};
use ddm_config::Policy;
use ddm_host_api::{ConsoleUser, HostCapabilities};
use ddm_store::{LedgerState, LedgerStore};
use ddm_util::{Clock, OsVersion, WallClock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    DeferralLedger, EnforcementRecord, HandledOutcome, LogEnforcementExtractor, MeetingWait,
    PromptContext, PromptOutcomeHandler, StartupDelay, compute_startup_delay, render_prompt,
    wait_for_meeting_to_end,
};

/// Invocation flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Ignore the version check and window, use the configured days remaining
    pub test_mode: bool,

    /// Skip the meeting wait and startup delay
    pub debug: bool,
}

impl RunOptions {
    fn skip_waits(&self) -> bool {
        self.test_mode || self.debug
    }
}

/// Why an invocation ended without prompting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoActionReason {
    NotInScope,
    UpToDate,
    OutsideWindow,
    Snoozed,
    MeetingTimeout,
}

impl NoActionReason {
    pub fn user_action(&self) -> UserAction {
        match self {
            Self::NotInScope => UserAction::NoEnforcement,
            Self::UpToDate => UserAction::UpToDate,
            Self::OutsideWindow => UserAction::OutsideWindow,
            Self::Snoozed => UserAction::Snoozed,
            Self::MeetingTimeout => UserAction::MeetingTimeout,
        }
    }
}

/// Terminal state of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoAction(NoActionReason),
    Prompted(HandledOutcome),
}

/// Everything one invocation learned, for logging and the health snapshot
#[derive(Debug, Clone)]
pub struct RunReport {
    pub decision: Decision,
    pub enforcement: Option<EnforcementRecord>,
    pub installed_version: Option<OsVersion>,

    /// Effective days remaining used for the decision
    pub days_remaining: Option<i64>,

    pub deferrals_remaining: Option<u32>,
    pub max_deferrals_at_threshold: Option<u32>,
    pub deferrals_used: Option<u32>,

    /// Damaged ledgers discarded during this run
    pub ledger_corruptions: u32,

    /// Install log could not be read
    pub log_error: Option<String>,

    /// Ledger writes that failed during this run
    pub ledger_errors: Vec<String>,

    pub meeting_wait: Option<MeetingWait>,
    pub startup_delay: Option<StartupDelay>,
}

impl RunReport {
    fn new(decision: Decision) -> Self {
        Self {
            decision,
            enforcement: None,
            installed_version: None,
            days_remaining: None,
            deferrals_remaining: None,
            max_deferrals_at_threshold: None,
            deferrals_used: None,
            ledger_corruptions: 0,
            log_error: None,
            ledger_errors: Vec::new(),
            meeting_wait: None,
            startup_delay: None,
        }
    }

    pub fn user_action(&self) -> UserAction {
        match &self.decision {
            Decision::NoAction(reason) => reason.user_action(),
            Decision::Prompted(handled) => handled.user_action,
        }
    }

    pub fn handled_outcome(&self) -> Option<&HandledOutcome> {
        match &self.decision {
            Decision::Prompted(handled) => Some(handled),
            Decision::NoAction(_) => None,
        }
    }

    pub fn run_status(&self) -> RunStatus {
        if self.handled_outcome().is_some_and(HandledOutcome::is_error) {
            RunStatus::DialogError
        } else if self.log_error.is_some() {
            RunStatus::LogParseError
        } else {
            RunStatus::Success
        }
    }

    /// Process exit code: non-zero only when the prompt collaborator failed
    pub fn exit_code(&self) -> i32 {
        self.handled_outcome().map_or(0, HandledOutcome::exit_code)
    }
}

/// Read-only view for `--status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub installed_version: Option<String>,
    pub enforcement: Option<EnforcementRecord>,
    pub update_required: Option<bool>,
    pub ledger: LedgerState,
    pub snooze_active: bool,
    pub snooze_minutes_remaining: i64,
    pub deferrals_remaining: Option<u32>,
    pub max_deferrals_at_threshold: Option<u32>,
}

/// Decides whether and how to remind on this invocation
pub struct ReminderDecisionProcedure {
    policy: Policy,
    extractor: LogEnforcementExtractor,
    store: Arc<dyn LedgerStore>,
    capabilities: HostCapabilities,
    clock: Box<dyn Clock>,
    options: RunOptions,
    rng: StdRng,
}

impl ReminderDecisionProcedure {
    pub fn new(
        policy: Policy,
        store: Arc<dyn LedgerStore>,
        capabilities: HostCapabilities,
        clock: Box<dyn Clock>,
        options: RunOptions,
    ) -> Self {
        let extractor = LogEnforcementExtractor::new(&policy.advanced.install_log);
        Self {
            policy,
            extractor,
            store,
            capabilities,
            clock,
            options,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the jitter source
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Read the enforcement from another log
    pub fn with_extractor(mut self, extractor: LogEnforcementExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    fn installed_version(&self) -> OsVersion {
        match self.capabilities.version.installed_version() {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "Could not determine installed version");
                OsVersion::parse("")
            }
        }
    }

    /// Run the full procedure once
    pub fn run(&mut self) -> RunReport {
        let now = self.clock.now();
        let installed = self.installed_version();
        debug!(installed = %installed, test_mode = self.options.test_mode, "Starting reminder run");

        let record = match self.extractor.extract(&installed, now) {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!("No enforcement in effect");
                let mut report = RunReport::new(Decision::NoAction(NoActionReason::NotInScope));
                report.installed_version = Some(installed);
                return report;
            }
            Err(e) => {
                error!(error = %e, "Install log unreadable, treating as no enforcement");
                let mut report = RunReport::new(Decision::NoAction(NoActionReason::NotInScope));
                report.installed_version = Some(installed);
                report.log_error = Some(e.to_string());
                return report;
            }
        };

        let mut report = RunReport::new(Decision::NoAction(NoActionReason::NotInScope));
        report.installed_version = Some(installed.clone());
        report.enforcement = Some(record.clone());
        report.decision = self.decide(&record, &installed, &mut report);
        report
    }

    fn decide(
        &mut self,
        record: &EnforcementRecord,
        installed: &OsVersion,
        report: &mut RunReport,
    ) -> Decision {
        let test_mode = self.options.test_mode;

        if !test_mode && !record.is_update_required(installed) {
            info!(installed = %installed, target = %record.target_version, "Already up to date");
            return Decision::NoAction(NoActionReason::UpToDate);
        }

        let days_remaining = if test_mode {
            info!(days = self.policy.advanced.test_days_remaining, "Test mode, overriding days remaining");
            self.policy.advanced.test_days_remaining
        } else {
            record.days_remaining
        };
        report.days_remaining = Some(days_remaining);

        let window = self.policy.behavior.display_reminder_days;
        if !test_mode && days_remaining > window {
            info!(days_remaining, window, "Outside reminder window");
            return Decision::NoAction(NoActionReason::OutsideWindow);
        }

        let store = Arc::clone(&self.store);
        let deferral_policy = self.policy.deferral.clone();
        let ledger = DeferralLedger::new(store.as_ref(), &deferral_policy);
        if let Err(e) = ledger.on_deadline_observed(record.deadline) {
            report.ledger_errors.push(e.to_string());
        }
        let decision = self.decide_with_ledger(record, installed, days_remaining, &ledger, report);

        report.deferrals_remaining = Some(ledger.remaining(days_remaining));
        report.max_deferrals_at_threshold = Some(ledger.max_allowed(days_remaining));
        report.deferrals_used = Some(ledger.deferrals_used());
        report.ledger_corruptions = ledger.corruption_count();
        decision
    }

    fn decide_with_ledger(
        &mut self,
        record: &EnforcementRecord,
        installed: &OsVersion,
        days_remaining: i64,
        ledger: &DeferralLedger<'_>,
        report: &mut RunReport,
    ) -> Decision {
        let now = self.clock.now();
        if ledger.is_snooze_active(now) {
            info!(
                minutes_remaining = ledger.snooze_minutes_remaining(now),
                "Snooze active, skipping reminder"
            );
            return Decision::NoAction(NoActionReason::Snoozed);
        }

        if self.options.skip_waits() {
            debug!("Skipping meeting wait and startup delay");
        } else {
            let cutoff = self.policy.behavior.ignore_assertions_within_hours;
            if record.hours_remaining > cutoff {
                let wait = wait_for_meeting_to_end(
                    self.capabilities.assertions.as_ref(),
                    self.capabilities.sleeper.as_ref(),
                    self.policy.behavior.meeting_delay,
                    self.policy.behavior.meeting_check_interval,
                );
                report.meeting_wait = Some(wait);
                if !wait.may_proceed() {
                    info!("Meeting still active, will retry next cycle");
                    return Decision::NoAction(NoActionReason::MeetingTimeout);
                }
            } else {
                info!(
                    hours_remaining = record.hours_remaining,
                    cutoff, "Deadline is close, ignoring display assertions"
                );
            }

            let delay = self.startup_delay();
            if !delay.duration().is_zero() {
                self.capabilities.sleeper.sleep(delay.duration());
            }
            report.startup_delay = Some(delay);
        }

        let handled = self.prompt(record, installed, days_remaining, ledger);
        if let Some(detail) = &handled.ledger_error {
            report.ledger_errors.push(detail.clone());
        }
        Decision::Prompted(handled)
    }

    fn startup_delay(&mut self) -> StartupDelay {
        let at = WallClock::from_naive_time(self.clock.now().time());
        compute_startup_delay(
            at,
            &self.policy.schedule.times,
            self.policy.behavior.schedule_tolerance_minutes,
            self.policy.behavior.random_delay_max,
            self.policy.schedule.login_delay,
            &mut self.rng,
        )
    }

    fn prompt(
        &self,
        record: &EnforcementRecord,
        installed: &OsVersion,
        days_remaining: i64,
        ledger: &DeferralLedger<'_>,
    ) -> HandledOutcome {
        let user = match self.capabilities.users.console_user() {
            Ok(Some(user)) => user,
            Ok(None) => ConsoleUser {
                username: String::new(),
                full_name: String::new(),
            },
            Err(e) => {
                warn!(error = %e, "Could not look up console user");
                ConsoleUser {
                    username: String::new(),
                    full_name: String::new(),
                }
            }
        };
        let device = self.capabilities.users.device_info().unwrap_or_else(|e| {
            warn!(error = %e, "Could not look up device info");
            Default::default()
        });

        let ctx = PromptContext {
            record,
            installed,
            days_remaining,
            deferrals_remaining: ledger.remaining(days_remaining),
            deferrals_used: ledger.deferrals_used(),
            max_deferrals: ledger.max_allowed(days_remaining),
            user: &user,
            device: &device,
            now: self.clock.now(),
        };
        let request = render_prompt(&self.policy, &ctx);
        info!(
            days_remaining,
            deferrals_remaining = ctx.deferrals_remaining,
            max_deferrals = ctx.max_deferrals,
            can_defer = request.can_defer(),
            blur = request.blur_screen,
            "Presenting reminder"
        );

        let outcome = self.capabilities.presenter.present(&request);
        debug!(?outcome, "Prompt returned");

        PromptOutcomeHandler::new(
            ledger,
            &self.policy.deferral,
            self.capabilities.update_surface.as_ref(),
        )
        .handle(outcome, &request, self.clock.now())
    }

    /// Snapshot of enforcement and ledger, without changing anything
    pub fn status(&self) -> StatusSummary {
        let now: DateTime<Local> = self.clock.now();
        let installed = self.installed_version();
        let enforcement = self
            .extractor
            .extract(&installed, now)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Install log unreadable");
                None
            });

        let ledger = DeferralLedger::read_only(self.store.as_ref(), &self.policy.deferral);
        let days = enforcement.as_ref().map(|r| r.days_remaining);

        StatusSummary {
            installed_version: Some(installed.to_string()).filter(|v| !v.is_empty()),
            update_required: enforcement.as_ref().map(|r| r.is_update_required(&installed)),
            deferrals_remaining: days.map(|d| ledger.remaining(d)),
            max_deferrals_at_threshold: days.map(|d| ledger.max_allowed(d)),
            snooze_active: ledger.is_snooze_active(now),
            snooze_minutes_remaining: ledger.snooze_minutes_remaining(now),
            ledger: ledger.state(),
            enforcement,
        }
    }
}
