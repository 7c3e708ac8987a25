//! Time utilities for ddm-reminder
//!
//! Provides the wall clock used for deadline arithmetic, schedule times for
//! the anti-stampede jitter, and the human-readable deadline format.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `DDM_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for exercising reminder windows and snooze expiry without waiting.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-11-10 09:00:00`)
//!
//! Example:
//! ```bash
//! DDM_MOCK_TIME="2025-11-10 09:00:00" ddm-reminder --domain com.example.ddm --debug
//! ```

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "DDM_MOCK_TIME";

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;
const MINUTES_PER_DAY: i32 = 24 * 60;

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Initialize the mock time offset based on the environment variable.
/// Returns the offset between mock time and real time at process start.
#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let real_now = chrono::Local::now();
                        let offset = mock_dt.signed_duration_since(real_now);
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    } else {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Source of the current time.
///
/// One invocation can block for a long time (meeting wait, jitter, an open
/// prompt), so anything recorded after those waits reads the clock again.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Clock backed by [`now()`], honouring mock time in debug builds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        now()
    }
}

/// Manually driven clock for tests. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Local>) {
        if let Ok(mut current) = self.current.lock() {
            *current = at;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Whole days from `now` until `deadline`, floored.
///
/// Negative once the deadline has passed; callers decide how to display that.
pub fn whole_days_until(deadline: &DateTime<Local>, now: &DateTime<Local>) -> i64 {
    deadline
        .signed_duration_since(*now)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// Whole hours from `now` until `deadline`, floored.
pub fn whole_hours_until(deadline: &DateTime<Local>, now: &DateTime<Local>) -> i64 {
    deadline
        .signed_duration_since(*now)
        .num_seconds()
        .div_euclid(SECONDS_PER_HOUR)
}

/// Format a deadline for end-user display: `Thu, 13-Nov-2025, 8:59 a.m.`
pub fn format_deadline(dt: &DateTime<Local>) -> String {
    dt.format("%a, %d-%b-%Y, %-I:%M %p")
        .to_string()
        .replace(" AM", " a.m.")
        .replace(" PM", " p.m.")
}

/// A time of day at which the scheduler launches the reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Build a wall clock, clamping out-of-range components into 0..=23 / 0..=59.
    pub fn clamped(hour: i64, minute: i64) -> Self {
        Self {
            hour: hour.clamp(0, 23) as u8,
            minute: minute.clamp(0, 59) as u8,
        }
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    /// Returns minutes since midnight
    pub fn as_minutes_from_midnight(&self) -> i32 {
        (self.hour as i32) * 60 + self.minute as i32
    }

    /// Circular distance in minutes between two times of day.
    ///
    /// 23:58 and 00:02 are four minutes apart.
    pub fn minutes_apart(&self, other: &WallClock) -> u32 {
        let diff = (self.as_minutes_from_midnight() - other.as_minutes_from_midnight()).abs();
        diff.min(MINUTES_PER_DAY - diff) as u32
    }
}

impl std::fmt::Display for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_minutes_from_midnight()
            .cmp(&other.as_minutes_from_midnight())
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_wall_clock_ordering() {
        let morning = WallClock::new(8, 0).unwrap();
        let noon = WallClock::new(12, 0).unwrap();
        let evening = WallClock::new(18, 30).unwrap();

        assert!(morning < noon);
        assert!(noon < evening);
        assert!(morning < evening);
    }

    #[test]
    fn test_wall_clock_rejects_out_of_range() {
        assert!(WallClock::new(24, 0).is_none());
        assert!(WallClock::new(12, 60).is_none());
        assert_eq!(WallClock::clamped(27, -5), WallClock::new(23, 0).unwrap());
    }

    #[test]
    fn test_minutes_apart_wraps_midnight() {
        let late = WallClock::new(23, 58).unwrap();
        let early = WallClock::new(0, 2).unwrap();
        assert_eq!(late.minutes_apart(&early), 4);
        assert_eq!(early.minutes_apart(&late), 4);

        let nine = WallClock::new(9, 0).unwrap();
        let nine_oh_three = WallClock::new(9, 3).unwrap();
        assert_eq!(nine.minutes_apart(&nine_oh_three), 3);
        assert_eq!(nine.minutes_apart(&nine), 0);
    }

    #[test]
    fn test_whole_days_and_hours_floor() {
        let now = Local.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap();

        let deadline = now + chrono::Duration::days(5) + chrono::Duration::hours(3);
        assert_eq!(whole_days_until(&deadline, &now), 5);
        assert_eq!(whole_hours_until(&deadline, &now), 123);

        // One second overdue floors to -1, it does not round to zero
        let overdue = now - chrono::Duration::seconds(1);
        assert_eq!(whole_days_until(&overdue, &now), -1);
        assert_eq!(whole_hours_until(&overdue, &now), -1);

        assert_eq!(whole_days_until(&now, &now), 0);
    }

    #[test]
    fn test_format_deadline() {
        let dt = Local.with_ymd_and_hms(2025, 11, 13, 8, 59, 56).unwrap();
        assert_eq!(format_deadline(&dt), "Thu, 13-Nov-2025, 8:59 a.m.");

        let dt = Local.with_ymd_and_hms(2025, 11, 25, 18, 5, 0).unwrap();
        assert_eq!(format_deadline(&dt), "Tue, 25-Nov-2025, 6:05 p.m.");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_manual_clock_advances_shared() {
        let start = Local.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let shared = clock.clone();
        shared.advance(Duration::from_secs(300));
        assert_eq!(clock.now(), start + chrono::Duration::minutes(5));
        clock.set(start);
        assert_eq!(shared.now(), start);
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_parse_mock_time_invalid_formats() {
        let invalid_formats = [
            "2025-12-25",
            "14:30:00",
            "2025/12/25 14:30:00",
            "2025-12-25T14:30:00",
            "",
            "not a date",
        ];

        for format_str in &invalid_formats {
            let result = NaiveDateTime::parse_from_str(format_str, "%Y-%m-%d %H:%M:%S");
            assert!(
                result.is_err(),
                "Expected '{}' to fail parsing, but it succeeded",
                format_str
            );
        }
    }
}
