//! End-to-end runs against the file-backed store
//!
//! Each test drives the decision procedure with a mock host, a manual clock
//! and a temporary install log, then checks what was left on disk.

use chrono::{DateTime, Duration, Local, TimeZone};
use ddm_api::{ErrorCode, PromptOutcome, RunStatus, UserAction};
use ddm_config::{parse_config, Policy};
use ddm_core::{
    Decision, DeadlineSource, LogEnforcementExtractor, NoActionReason, ReminderDecisionProcedure,
    RunOptions, RunReport,
};
use ddm_host_api::MockHost;
use ddm_reminder::HealthReporter;
use ddm_store::{HealthStore, JsonFileStore, LedgerLoad, LedgerStore};
use ddm_util::{ledger_path, ManualClock, RunId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

fn start() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 11, 10, 11, 30, 0).unwrap()
}

fn enforcement_line(deadline: DateTime<Local>, version: &str) -> String {
    format!(
        "2025-11-01 10:00:01-05 host softwareupdated[88]: DDM |EnforcedInstallDate:{}|VersionString:{}|BuildVersionString:24B83|",
        deadline.format("%Y-%m-%dT%H:%M:%S"),
        version
    )
}

struct Device {
    dir: TempDir,
    host: MockHost,
    clock: ManualClock,
    store: Arc<JsonFileStore>,
    policy: Policy,
}

impl Device {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(start());
        let store = Arc::new(JsonFileStore::new(
            ledger_path(dir.path()),
            dir.path().join("health.json"),
        ));
        Self {
            host: MockHost::new()
                .with_installed_version("15.0.1")
                .with_clock(clock.clone()),
            clock,
            store,
            policy: Policy::default(),
            dir,
        }
    }

    fn log_path(&self) -> PathBuf {
        self.dir.path().join("install.log")
    }

    fn write_log(&self, lines: &[String]) {
        let mut content = String::from("2025-11-01 09:59:00-05 host softwareupdated[88]: starting\n");
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        std::fs::write(self.log_path(), content).unwrap();
    }

    fn enforce(&self, deadline: DateTime<Local>) {
        self.write_log(&[enforcement_line(deadline, "15.1")]);
    }

    fn run(&self) -> RunReport {
        ReminderDecisionProcedure::new(
            self.policy.clone(),
            self.store.clone(),
            self.host.capabilities(),
            Box::new(self.clock.clone()),
            RunOptions::default(),
        )
        .with_extractor(LogEnforcementExtractor::new(self.log_path()))
        .with_rng(StdRng::seed_from_u64(7))
        .run()
    }

    fn ledger_on_disk(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.store.ledger_path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn deferral_count(&self) -> u64 {
        self.ledger_on_disk()["deferral_count"].as_u64().unwrap()
    }
}

#[test]
fn five_days_out_defer_then_remind_again() {
    let device = Device::new();
    device.enforce(start() + Duration::days(5) + Duration::hours(2));
    device.host.queue_outcome(PromptOutcome::Defer);

    let first = device.run();
    assert_eq!(first.days_remaining, Some(5));
    assert_eq!(first.max_deferrals_at_threshold, Some(5));
    assert_eq!(first.user_action(), UserAction::Deferred);
    assert_eq!(device.deferral_count(), 1);

    let prompts = device.host.presented_prompts();
    assert!(prompts[0].message.contains("5 of 5"));

    device.clock.advance(StdDuration::from_secs(3600));
    let second = device.run();
    let prompts = device.host.presented_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].message.contains("4 of 5"));
    assert_eq!(second.deferrals_remaining, Some(4));
    assert_eq!(second.user_action(), UserAction::SnoozedByTimeout);
}

#[test]
fn past_deadline_uses_padded_deadline() {
    let device = Device::new();
    let padded = start() + Duration::days(3);
    device.write_log(&[
        enforcement_line(start() - Duration::days(1), "15.1"),
        format!(
            "2025-11-09 08:00:00-05 host softwareupdated[88]: setPastDuePaddedEnforcementDate is set: {}",
            padded.format("%a %b %d %H:%M:%S %Y")
        ),
    ]);

    let report = device.run();
    let record = report.enforcement.as_ref().unwrap();
    assert_eq!(record.deadline_source, DeadlineSource::Padded);
    assert_eq!(record.deadline, padded);
    assert_eq!(report.days_remaining, Some(3));
    assert!(matches!(report.decision, Decision::Prompted(_)));
}

#[test]
fn no_enforcement_leaves_no_state() {
    let device = Device::new();
    device.write_log(&["2025-11-01 10:00:00-05 host softwareupdated[88]: idle".to_string()]);

    let report = device.run();
    assert_eq!(report.decision, Decision::NoAction(NoActionReason::NotInScope));
    assert!(device.host.presented_prompts().is_empty());
    assert!(!device.store.ledger_path().exists());
}

#[test]
fn new_deadline_restores_budget() {
    let device = Device::new();
    device.enforce(start() + Duration::days(5) + Duration::hours(2));
    for _ in 0..2 {
        device.host.queue_outcome(PromptOutcome::Defer);
        device.run();
    }
    assert_eq!(device.deferral_count(), 2);

    let moved = start() + Duration::days(7) + Duration::hours(2);
    device.enforce(moved);
    let report = device.run();
    assert_eq!(report.deferrals_used, Some(0));
    assert_eq!(device.deferral_count(), 0);

    let reloaded = match device.store.load_ledger().unwrap() {
        LedgerLoad::Loaded(state) => state,
        other => panic!("unexpected ledger {:?}", other),
    };
    assert_eq!(reloaded.last_deadline, Some(moved));
}

#[test]
fn same_deadline_keeps_count_across_processes() {
    let device = Device::new();
    device.enforce(start() + Duration::days(5) + Duration::hours(2));
    device.host.queue_outcome(PromptOutcome::Defer);
    device.run();

    device.clock.advance(StdDuration::from_secs(3600));
    device.host.queue_outcome(PromptOutcome::Defer);
    let report = device.run();
    assert_eq!(report.deferrals_used, Some(2));
    assert_eq!(device.deferral_count(), 2);
}

#[test]
fn snooze_is_honoured_by_the_next_invocation() {
    let mut device = Device::new();
    device.policy = parse_config(
        r#"
config_version = 1

[deferral]
snooze_enabled = true
snooze_minutes = 120
"#,
    )
    .unwrap();
    device.enforce(start() + Duration::days(5) + Duration::hours(2));
    device.host.queue_outcome(PromptOutcome::Snooze);

    let first = device.run();
    assert_eq!(
        first.handled_outcome().and_then(|h| h.code),
        Some(ErrorCode::UserSnoozed)
    );
    assert!(device.ledger_on_disk()["snooze_until"].is_string());

    device.clock.advance(StdDuration::from_secs(60 * 60));
    let second = device.run();
    assert_eq!(second.decision, Decision::NoAction(NoActionReason::Snoozed));

    device.clock.advance(StdDuration::from_secs(61 * 60));
    let third = device.run();
    assert!(matches!(third.decision, Decision::Prompted(_)));
    assert_eq!(device.host.presented_prompts().len(), 2);
    assert_eq!(device.deferral_count(), 0);
}

#[test]
fn damaged_ledger_is_quarantined_and_run_continues() {
    let device = Device::new();
    device.enforce(start() + Duration::days(5) + Duration::hours(2));
    std::fs::write(device.store.ledger_path(), "{ not json").unwrap();
    device.host.queue_outcome(PromptOutcome::Defer);

    let report = device.run();
    assert_eq!(report.ledger_corruptions, 1);
    assert_eq!(report.user_action(), UserAction::Deferred);
    assert_eq!(device.deferral_count(), 1);

    let quarantined = std::fs::read_to_string(device.store.quarantine_path()).unwrap();
    assert_eq!(quarantined, "{ not json");
}

fn report_health(store: &JsonFileStore, policy: &Policy, report: &RunReport) {
    let mut reporter = HealthReporter::begin(store, &policy.health, start(), RunId::new(), 1);
    reporter.record_run(report, start());
    reporter.finish();
}

fn health_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn health_snapshot_reflects_the_run() {
    let device = Device::new();
    let deadline = start() + Duration::days(5) + Duration::hours(2);
    device.enforce(deadline);
    device.host.queue_outcome(PromptOutcome::Defer);

    let report = device.run();
    report_health(&device.store, &device.policy, &report);

    let json = health_json(device.store.health_path());
    assert_eq!(json["last_run_status"], "Success");
    assert_eq!(json["last_error_code"], 501);
    assert_eq!(json["last_error_category"], "UserAction");
    assert_eq!(json["last_user_action"], "Deferred");
    assert_eq!(json["target_version"], "15.1");
    assert_eq!(json["deferrals_remaining"], 4);
    assert_eq!(json["deferrals_used"], 1);
    assert_eq!(json["binary_version"], env!("CARGO_PKG_VERSION"));

    let snapshot = device.store.load_health().unwrap().unwrap();
    assert_eq!(snapshot.current_deadline, Some(deadline));
}

#[test]
fn health_snapshot_records_dialog_failures() {
    let device = Device::new();
    device.enforce(start() + Duration::days(5) + Duration::hours(2));
    device
        .host
        .queue_outcome(PromptOutcome::Error("dialog not found at /usr/local/bin/dialog".into()));

    let report = device.run();
    assert_eq!(report.exit_code(), 1);
    report_health(&device.store, &device.policy, &report);

    let snapshot = device.store.load_health().unwrap().unwrap();
    assert_eq!(snapshot.last_run_status, RunStatus::DialogError);
    assert_eq!(snapshot.last_error_code, ErrorCode::DialogExecFailed);
    assert_eq!(snapshot.error_log.len(), 1);
    assert!(snapshot.error_log[0].message.contains("dialog not found"));
}
