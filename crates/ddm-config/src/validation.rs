//! Configuration validation
//!
//! Two tiers: hard errors reject the whole config (malformed schedule
//! times, contradictory threshold tables, unusable domain), while
//! out-of-range numbers are clamped by [`clamp_setting`] with a warning.

use crate::schema::RawConfig;
use ddm_util::{OsVersion, PreferenceDomain, WallClock};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Duplicate deferral threshold for {0} days remaining")]
    DuplicateThreshold(i64),

    #[error("Deferral threshold {days_remaining}: {message}")]
    ThresholdError { days_remaining: i64, message: String },

    #[error("Invalid preference domain '{0}': expected reverse-DNS like com.example.app")]
    InvalidDomain(String),

    #[error("Invalid version '{value}' for {field}")]
    InvalidVersion { field: String, value: String },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(domain) = &config.organization.domain
        && PreferenceDomain::parse(domain).is_none()
    {
        errors.push(ValidationError::InvalidDomain(domain.clone()));
    }

    for time in &config.schedule.times {
        if let Err(message) = parse_time(time) {
            errors.push(ValidationError::InvalidTimeFormat {
                value: time.clone(),
                message,
            });
        }
    }

    let mut seen = HashSet::new();
    for entry in &config.deferral.schedule {
        if !seen.insert(entry.days_remaining) {
            errors.push(ValidationError::DuplicateThreshold(entry.days_remaining));
        }
        if entry.days_remaining < 0 {
            errors.push(ValidationError::ThresholdError {
                days_remaining: entry.days_remaining,
                message: "days_remaining cannot be negative".into(),
            });
        }
        if entry.max_deferrals < 0 {
            errors.push(ValidationError::ThresholdError {
                days_remaining: entry.days_remaining,
                message: "max_deferrals cannot be negative".into(),
            });
        }
    }

    if let Some(version) = &config.advanced.dialog_min_version
        && OsVersion::parse(version).components().is_empty()
    {
        errors.push(ValidationError::InvalidVersion {
            field: "advanced.dialog_min_version".into(),
            value: version.clone(),
        });
    }

    if let Some(path) = &config.advanced.dialog_binary
        && path.as_os_str().is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "advanced.dialog_binary cannot be empty".into(),
        ));
    }

    errors
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<WallClock, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Expected HH:MM format".into());
    }

    let hour: u8 = parts[0]
        .trim()
        .parse()
        .map_err(|_| "Invalid hour".to_string())?;
    let minute: u8 = parts[1]
        .trim()
        .parse()
        .map_err(|_| "Invalid minute".to_string())?;

    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 0-59".into());
    }

    WallClock::new(hour, minute).ok_or_else(|| "Time out of range".to_string())
}

/// Resolve an optional integer setting, clamping it into `min..=max`.
///
/// Logs a warning naming the key whenever the configured value is adjusted.
pub fn clamp_setting(value: Option<i64>, default: i64, min: i64, max: i64, key: &str) -> i64 {
    let val = value.unwrap_or(default);
    if val < min {
        warn!(key, value = val, min, "Configuration value below minimum, using minimum");
        return min;
    }
    if val > max {
        warn!(key, value = val, max, "Configuration value above maximum, using maximum");
        return max;
    }
    val
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawDeferralThreshold;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("14:30").unwrap(), WallClock::new(14, 30).unwrap());
        assert_eq!(parse_time("00:00").unwrap(), WallClock::new(0, 0).unwrap());
        assert_eq!(parse_time("23:59").unwrap(), WallClock::new(23, 59).unwrap());

        assert!(parse_time("24:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("invalid").is_err());
        assert!(parse_time("9").is_err());
    }

    #[test]
    fn test_clamp_setting() {
        assert_eq!(clamp_setting(None, 14, 1, 30, "days"), 14);
        assert_eq!(clamp_setting(Some(0), 14, 1, 30, "days"), 1);
        assert_eq!(clamp_setting(Some(99), 14, 1, 30, "days"), 30);
        assert_eq!(clamp_setting(Some(7), 14, 1, 30, "days"), 7);
    }

    #[test]
    fn test_duplicate_threshold_detection() {
        let mut config = RawConfig {
            config_version: 1,
            ..Default::default()
        };
        config.deferral.schedule = vec![
            RawDeferralThreshold {
                days_remaining: 7,
                max_deferrals: 5,
            },
            RawDeferralThreshold {
                days_remaining: 7,
                max_deferrals: 3,
            },
        ];

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::DuplicateThreshold(7)));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = RawConfig::default();
        config.deferral.schedule = vec![RawDeferralThreshold {
            days_remaining: -1,
            max_deferrals: -2,
        }];

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_bad_domain_and_times() {
        let mut config = RawConfig::default();
        config.organization.domain = Some("not a domain".into());
        config.schedule.times = vec!["09:00".into(), "25:00".into(), "noon".into()];

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::InvalidDomain(_)));
    }

    #[test]
    fn test_bad_min_version() {
        let mut config = RawConfig::default();
        config.advanced.dialog_min_version = Some("latest".into());

        let errors = validate_config(&config);
        assert!(matches!(errors[0], ValidationError::InvalidVersion { .. }));
    }
}
