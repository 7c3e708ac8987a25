//! Config validation CLI tool
//!
//! Validates a ddm-reminder configuration file and reports any errors.

use ddm_util::{PreferenceDomain, default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path(&PreferenceDomain::default());
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a ddm-reminder configuration file.");
            eprintln!();
            eprintln!("Default location: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match ddm_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", ddm_config::CURRENT_CONFIG_VERSION);
            println!("  Domain: {}", policy.organization.domain);
            println!("  State directory: {}", policy.state_dir().display());
            println!(
                "  Reminder window: {} days (blur at {} days)",
                policy.behavior.display_reminder_days, policy.behavior.blurscreen_days
            );
            println!(
                "  Meeting wait: up to {}, polling every {}",
                format_duration(policy.behavior.meeting_delay),
                format_duration(policy.behavior.meeting_check_interval)
            );

            println!();
            println!("Deferral schedule:");
            for threshold in policy.deferral.schedule() {
                println!(
                    "  - <= {} days: {} deferrals",
                    threshold.days_remaining, threshold.max_deferrals
                );
            }
            println!("  - otherwise: {} deferrals", policy.deferral.max_deferrals);
            if policy.deferral.snooze_enabled {
                println!("  Snooze: {} minutes", policy.deferral.snooze_minutes);
            }

            let times: Vec<String> = policy.schedule.times.iter().map(|t| t.to_string()).collect();
            println!();
            println!("Scheduled runs: {}", times.join(", "));

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ddm_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ddm_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ddm_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ddm_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        ddm_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
