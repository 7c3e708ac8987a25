//! Applying the user's answer to a prompt

use chrono::{DateTime, Local};
use ddm_api::{ErrorCode, PromptOutcome, PromptRequest, UserAction};
use ddm_config::DeferralPolicy;
use ddm_host_api::UpdateSurface;
use tracing::{error, info, warn};

use crate::DeferralLedger;

/// What handling an outcome did, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledOutcome {
    pub user_action: UserAction,
    pub code: Option<ErrorCode>,

    /// Collaborator failure detail; the invocation exits non-zero
    pub error: Option<String>,

    /// Ledger write that failed while applying the outcome
    pub ledger_error: Option<String>,
}

impl HandledOutcome {
    fn action(user_action: UserAction) -> Self {
        Self {
            user_action,
            code: user_action.error_code(),
            error: None,
            ledger_error: None,
        }
    }

    fn with_ledger_result<T, E: std::fmt::Display>(mut self, result: Result<T, E>) -> Self {
        if let Err(e) = result {
            self.ledger_error = Some(e.to_string());
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Process exit code: only a collaborator error is non-zero
    pub fn exit_code(&self) -> i32 {
        if self.is_error() { 1 } else { 0 }
    }
}

/// Maps a prompt outcome to ledger mutations and side effects
pub struct PromptOutcomeHandler<'a> {
    ledger: &'a DeferralLedger<'a>,
    policy: &'a DeferralPolicy,
    update_surface: &'a dyn UpdateSurface,
}

impl<'a> PromptOutcomeHandler<'a> {
    pub fn new(
        ledger: &'a DeferralLedger<'a>,
        policy: &'a DeferralPolicy,
        update_surface: &'a dyn UpdateSurface,
    ) -> Self {
        Self {
            ledger,
            policy,
            update_surface,
        }
    }

    pub fn handle(
        &self,
        outcome: PromptOutcome,
        request: &PromptRequest,
        now: DateTime<Local>,
    ) -> HandledOutcome {
        match outcome {
            PromptOutcome::OpenUpdate => self.open_update(),
            PromptOutcome::Defer if request.can_defer() => {
                info!("User chose to defer");
                HandledOutcome::action(UserAction::Deferred)
                    .with_ledger_result(self.ledger.record_deferral(now))
            }
            PromptOutcome::Defer => {
                warn!("Defer reported while no deferrals remain, handling as timeout");
                self.timeout(request, now)
            }
            PromptOutcome::Snooze if self.policy.snooze_enabled => {
                info!(minutes = self.policy.snooze_minutes, "User chose to snooze");
                let mut handled = HandledOutcome::action(UserAction::Snoozed)
                    .with_ledger_result(self.ledger.record_snooze(self.policy.snooze_minutes, now));
                handled.code = Some(ErrorCode::UserSnoozed);
                handled
            }
            PromptOutcome::Snooze => {
                warn!("Snooze reported while snoozing is disabled, handling as timeout");
                self.timeout(request, now)
            }
            PromptOutcome::Info => {
                info!("User viewed help");
                HandledOutcome::action(UserAction::ViewedHelp)
            }
            PromptOutcome::Timeout => self.timeout(request, now),
            PromptOutcome::Error(detail) => {
                error!(%detail, "Prompt failed");
                HandledOutcome {
                    user_action: UserAction::Error,
                    code: Some(ErrorCode::DialogExecFailed),
                    error: Some(detail),
                    ledger_error: None,
                }
            }
        }
    }

    fn open_update(&self) -> HandledOutcome {
        info!("User chose to open Software Update");
        if let Err(e) = self.update_surface.open_software_update() {
            error!(error = %e, "Failed to open Software Update");
        }
        HandledOutcome::action(UserAction::OpenedSoftwareUpdate)
    }

    fn timeout(&self, request: &PromptRequest, now: DateTime<Local>) -> HandledOutcome {
        if request.auto_proceed_seconds.is_some() {
            info!("Auto-proceed elapsed with deferrals exhausted");
            return self.open_update();
        }

        if self.policy.snooze_enabled {
            info!(minutes = self.policy.snooze_minutes, "Prompt timed out, treating as snooze");
            HandledOutcome::action(UserAction::SnoozedByTimeout)
                .with_ledger_result(self.ledger.record_snooze(self.policy.snooze_minutes, now))
        } else {
            info!("Prompt timed out");
            HandledOutcome::action(UserAction::Timeout)
        }
    }
}
