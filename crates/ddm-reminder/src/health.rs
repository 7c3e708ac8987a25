//! Health snapshot reporting for one invocation

use chrono::{DateTime, Local};
use ddm_api::{ErrorCode, RunStatus, UserAction};
use ddm_config::HealthPolicy;
use ddm_core::{Decision, RunReport};
use ddm_store::{HealthSnapshot, HealthStore};
use ddm_util::RunId;
use tracing::{debug, warn};

/// Accumulates the snapshot for this run and writes it once at the end
pub struct HealthReporter<'a> {
    store: &'a dyn HealthStore,
    policy: HealthPolicy,
    snapshot: HealthSnapshot,
}

impl<'a> HealthReporter<'a> {
    /// Start from the previous snapshot so counters and the error log carry over
    pub fn begin(
        store: &'a dyn HealthStore,
        policy: &HealthPolicy,
        now: DateTime<Local>,
        run_id: RunId,
        config_version: u32,
    ) -> Self {
        let mut snapshot = match store.load_health() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => HealthSnapshot::default(),
            Err(e) => {
                warn!(error = %e, "Previous health snapshot unreadable, starting fresh");
                HealthSnapshot::default()
            }
        };
        snapshot.begin_run(now, run_id, config_version, env!("CARGO_PKG_VERSION"));

        Self {
            store,
            policy: policy.clone(),
            snapshot,
        }
    }

    pub fn snapshot(&self) -> &HealthSnapshot {
        &self.snapshot
    }

    /// Fold a completed run into the snapshot
    pub fn record_run(&mut self, report: &RunReport, now: DateTime<Local>) {
        let max = self.policy.max_error_entries;
        let snapshot = &mut self.snapshot;

        if let Some(record) = &report.enforcement {
            snapshot.current_deadline = Some(record.deadline);
            snapshot.target_version = Some(record.target_version.to_string());
        } else {
            snapshot.current_deadline = None;
            snapshot.target_version = None;
        }
        snapshot.deferrals_remaining = report.deferrals_remaining;
        snapshot.max_deferrals_at_threshold = report.max_deferrals_at_threshold;
        snapshot.deferrals_used = report.deferrals_used;
        snapshot.last_user_action = report.user_action();

        if report.ledger_corruptions > 0 {
            snapshot.ledger_corruption_count += report.ledger_corruptions;
            snapshot.record_error(
                now,
                ErrorCode::LedgerCorrupt,
                "Deferral ledger was damaged and reset to empty",
                max,
            );
        }
        if let Some(detail) = &report.log_error {
            snapshot.record_error(now, ErrorCode::LogParseError, detail.clone(), max);
        }
        for detail in &report.ledger_errors {
            warn!(%detail, "Ledger write failed during run");
            snapshot.record_error(now, ErrorCode::LedgerWriteFailed, detail.clone(), max);
        }

        let code = match &report.decision {
            Decision::Prompted(handled) => {
                if let (Some(detail), Some(code)) = (&handled.error, handled.code) {
                    snapshot.record_error(now, code, detail.clone(), max);
                }
                handled.code
            }
            Decision::NoAction(_) => None,
        };
        snapshot.record_status(report.run_status(), code);
    }

    /// Record a run that failed before the decision procedure
    pub fn record_failure(
        &mut self,
        status: RunStatus,
        code: ErrorCode,
        message: impl Into<String>,
        now: DateTime<Local>,
    ) {
        let max = self.policy.max_error_entries;
        self.snapshot.record_error(now, code, message, max);
        self.snapshot.last_user_action = UserAction::None;
        self.snapshot.record_status(status, Some(code));
    }

    /// Write the snapshot if health reporting is enabled
    pub fn finish(self) -> HealthSnapshot {
        if self.policy.enabled {
            match self.store.save_health(&self.snapshot) {
                Ok(()) => debug!("Health snapshot written"),
                Err(e) => warn!(error = %e, "Failed to write health snapshot"),
            }
        }
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ddm_api::ErrorCategory;
    use ddm_config::Policy;
    use ddm_core::{HandledOutcome, NoActionReason};
    use ddm_store::MemoryStore;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap()
    }

    fn no_action(reason: NoActionReason) -> RunReport {
        let mut report = test_report();
        report.decision = Decision::NoAction(reason);
        report
    }

    fn test_report() -> RunReport {
        RunReport {
            decision: Decision::NoAction(NoActionReason::NotInScope),
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

    #[test]
    fn no_action_run_is_success() {
        let store = MemoryStore::new();
        let policy = Policy::default().health;
        let mut reporter = HealthReporter::begin(&store, &policy, now(), RunId::new(), 1);
        reporter.record_run(&no_action(NoActionReason::UpToDate), now());
        let snapshot = reporter.finish();

        assert_eq!(snapshot.last_run_status, RunStatus::Success);
        assert_eq!(snapshot.last_error_code, ErrorCode::Success);
        assert_eq!(snapshot.last_user_action, UserAction::UpToDate);
        assert_eq!(store.load_health().unwrap(), Some(snapshot));
    }

    #[test]
    fn corruption_count_accumulates_across_runs() {
        let store = MemoryStore::new();
        let policy = Policy::default().health;
        for _ in 0..2 {
            let mut report = no_action(NoActionReason::Snoozed);
            report.ledger_corruptions = 1;
            let mut reporter = HealthReporter::begin(&store, &policy, now(), RunId::new(), 1);
            reporter.record_run(&report, now());
            reporter.finish();
        }
        let snapshot = store.load_health().unwrap().unwrap();
        assert_eq!(snapshot.ledger_corruption_count, 2);
        assert_eq!(snapshot.error_log.len(), 2);
        assert_eq!(snapshot.error_log[0].code, ErrorCode::LedgerCorrupt);
    }

    #[test]
    fn lost_deferral_write_lands_in_error_log() {
        let store = MemoryStore::new();
        let policy = Policy::default().health;
        let mut report = test_report();
        report.decision = Decision::Prompted(HandledOutcome {
            user_action: UserAction::Deferred,
            code: Some(ErrorCode::UserDeferred),
            error: None,
            ledger_error: Some("disk full".into()),
        });
        report.ledger_errors.push("disk full".into());

        let mut reporter = HealthReporter::begin(&store, &policy, now(), RunId::new(), 1);
        reporter.record_run(&report, now());
        let snapshot = reporter.finish();

        assert_eq!(snapshot.last_user_action, UserAction::Deferred);
        assert_eq!(snapshot.error_log.len(), 1);
        assert_eq!(snapshot.error_log[0].code, ErrorCode::LedgerWriteFailed);
        assert_eq!(snapshot.error_log[0].message, "disk full");
    }

    #[test]
    fn failure_is_logged() {
        let store = MemoryStore::new();
        let policy = Policy::default().health;
        let mut reporter = HealthReporter::begin(&store, &policy, now(), RunId::new(), 1);
        reporter.record_failure(
            RunStatus::PreflightFailed,
            ErrorCode::NoConsoleUser,
            "No logged-in console user",
            now(),
        );
        let snapshot = reporter.finish();
        assert_eq!(snapshot.last_run_status, RunStatus::PreflightFailed);
        assert_eq!(snapshot.last_error_code, ErrorCode::NoConsoleUser);
        assert_eq!(snapshot.last_error_category, ErrorCategory::System);
    }

    #[test]
    fn disabled_reporting_writes_nothing() {
        let store = MemoryStore::new();
        let mut policy = Policy::default().health;
        policy.enabled = false;
        let reporter = HealthReporter::begin(&store, &policy, now(), RunId::new(), 1);
        reporter.finish();
        assert_eq!(store.load_health().unwrap(), None);
    }
}
