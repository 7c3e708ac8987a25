//! ddm-reminder - reminds the console user about a DDM-enforced macOS update
//!
//! Invoked by the system scheduler at the configured times. One invocation:
//! - Loads configuration for the preference domain
//! - Runs the preflight checks
//! - Runs the reminder decision procedure
//! - Writes the health snapshot and exits

use anyhow::{Context, Result};
use clap::Parser;
use ddm_api::{ErrorCode, RunStatus};
use ddm_config::{load_config, Policy, CURRENT_CONFIG_VERSION};
use ddm_core::{DeferralLedger, ReminderDecisionProcedure, RunOptions};
use ddm_host_macos::{is_root, macos_capabilities, MacUserInfoProbe};
use ddm_reminder::{init_logging, preflight, HealthReporter};
use ddm_store::JsonFileStore;
use ddm_util::{
    default_config_path, default_state_dir, ledger_path, PreferenceDomain, RunId, SystemClock,
    DEFAULT_MANAGEMENT_DIR,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// ddm-reminder - Reminder dialogs for DDM-enforced macOS updates
#[derive(Parser, Debug)]
#[command(name = "ddm-reminder", version)]
#[command(about = "Reminder dialogs for DDM-enforced macOS updates", long_about = None)]
struct Args {
    /// Reverse-DNS preference domain (e.g. com.example.ddmreminder)
    #[arg(short, long, env = "DDM_DOMAIN", value_parser = parse_domain)]
    domain: PreferenceDomain,

    /// Configuration file path (default: /Library/Application Support/<domain>/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Debug logging, same as `advanced.verbose_logging`
    #[arg(short, long)]
    verbose: bool,

    /// Ignore the installed version and the reminder window
    #[arg(long)]
    test: bool,

    /// Skip the root check, meeting wait and startup delay
    #[arg(long)]
    debug: bool,

    /// Clear the deferral count and exit
    #[arg(long)]
    reset_deferrals: bool,

    /// Clear an active snooze and exit
    #[arg(long)]
    clear_snooze: bool,

    /// Print enforcement and ledger state as JSON and exit
    #[arg(long)]
    status: bool,
}

fn parse_domain(raw: &str) -> Result<PreferenceDomain, String> {
    PreferenceDomain::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not a reverse-DNS domain (e.g. com.example.ddmreminder)"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&args.domain));

    let logging = init_logging(&args.log_level, args.verbose);

    let run_id = RunId::new();
    let span = info_span!("run", %run_id, domain = %args.domain);
    let _guard = span.enter();

    info!(version = env!("CARGO_PKG_VERSION"), "ddm-reminder starting");

    let loaded = load_config(&config_path);
    if loaded
        .as_ref()
        .is_ok_and(|policy| policy.advanced.verbose_logging)
    {
        logging.enable_verbose();
        debug!("Verbose logging enabled by configuration");
    }

    let mut policy = match loaded {
        Ok(policy) => policy,
        Err(e) => {
            error!(config_path = %config_path.display(), error = %e, "Configuration not usable");
            let (status, code) = if e.is_missing() {
                (RunStatus::ConfigMissing, ErrorCode::ConfigMissing)
            } else {
                (RunStatus::ConfigError, ErrorCode::ConfigInvalid)
            };
            report_early_failure(
                &args.domain,
                &Policy::default(),
                run_id,
                status,
                code,
                &e.to_string(),
            );
            std::process::exit(1);
        }
    };
    policy.organization.domain = args.domain.clone();

    info!(
        config_path = %config_path.display(),
        thresholds = policy.deferral.schedule().len(),
        "Configuration loaded"
    );

    let state_dir = policy.state_dir();
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create state directory {:?}", state_dir))?;
    let store = Arc::new(JsonFileStore::new(
        ledger_path(&state_dir),
        policy.health_path(),
    ));

    if args.reset_deferrals || args.clear_snooze {
        let ledger = DeferralLedger::new(store.as_ref(), &policy.deferral);
        if args.reset_deferrals {
            ledger.reset().context("Failed to reset deferrals")?;
            info!("Deferral count reset");
        }
        if args.clear_snooze {
            ledger.clear_snooze().context("Failed to clear snooze")?;
            info!("Snooze cleared");
        }
        return Ok(());
    }

    let options = RunOptions {
        test_mode: args.test || policy.advanced.test_mode,
        debug: args.debug,
    };

    let capabilities = macos_capabilities(
        policy.advanced.dialog_binary.clone(),
        policy.advanced.dialog_min_version.clone(),
    );
    let health_policy = policy.health.clone();
    let mut procedure = ReminderDecisionProcedure::new(
        policy,
        store.clone(),
        capabilities,
        Box::new(SystemClock),
        options,
    );

    if args.status {
        let summary = procedure.status();
        let json = serde_json::to_string_pretty(&summary).context("Failed to encode status")?;
        println!("{json}");
        return Ok(());
    }

    let mut reporter = HealthReporter::begin(
        store.as_ref(),
        &health_policy,
        ddm_util::now(),
        run_id,
        CURRENT_CONFIG_VERSION,
    );

    let require_root = !(options.test_mode || options.debug);
    if let Err(e) = preflight(&MacUserInfoProbe, require_root, is_root()) {
        error!(error = %e, "Preflight failed");
        reporter.record_failure(
            RunStatus::PreflightFailed,
            e.code(),
            e.to_string(),
            ddm_util::now(),
        );
        reporter.finish();
        std::process::exit(1);
    }

    let report = procedure.run();
    info!(
        action = %report.user_action(),
        status = ?report.run_status(),
        days_remaining = ?report.days_remaining,
        deferrals_remaining = ?report.deferrals_remaining,
        "Run complete"
    );

    reporter.record_run(&report, ddm_util::now());
    reporter.finish();

    let code = report.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Record a failure that happened before a configuration was available
fn report_early_failure(
    domain: &PreferenceDomain,
    defaults: &Policy,
    run_id: RunId,
    status: RunStatus,
    code: ErrorCode,
    message: &str,
) {
    let state_dir = default_state_dir(Path::new(DEFAULT_MANAGEMENT_DIR), domain);
    if let Err(e) = std::fs::create_dir_all(&state_dir) {
        warn!(error = %e, "Cannot create state directory for health snapshot");
        return;
    }
    let store = JsonFileStore::new(ledger_path(&state_dir), state_dir.join("health.json"));
    let mut reporter = HealthReporter::begin(&store, &defaults.health, ddm_util::now(), run_id, 0);
    reporter.record_failure(status, code, message, ddm_util::now());
    reporter.finish();
}
