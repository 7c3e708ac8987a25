//! Startup delay that spreads a fleet's scheduled launches apart

use ddm_util::{WallClock, format_duration};
use rand::Rng;
use std::time::Duration;
use tracing::info;

/// Delay applied before showing a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupDelay {
    None,
    /// Launched near a scheduled time; random delay against a fleet stampede
    Random {
        scheduled: WallClock,
        delay: Duration,
    },
    /// Launched at some other time (login, manual run)
    Login(Duration),
}

impl StartupDelay {
    pub fn duration(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Random { delay, .. } => *delay,
            Self::Login(delay) => *delay,
        }
    }
}

/// Scheduled time within `tolerance_minutes` of `at`, wrapping midnight
pub fn matching_schedule_time(
    at: WallClock,
    times: &[WallClock],
    tolerance_minutes: u32,
) -> Option<WallClock> {
    times
        .iter()
        .copied()
        .find(|t| t.minutes_apart(&at) <= tolerance_minutes)
}

/// Pick the delay for a launch at `at`.
///
/// Near a scheduled time the delay is uniform in `0..=random_max` whole
/// seconds; otherwise the fixed login delay applies.
pub fn compute_startup_delay<R: Rng + ?Sized>(
    at: WallClock,
    times: &[WallClock],
    tolerance_minutes: u32,
    random_max: Duration,
    login_delay: Duration,
    rng: &mut R,
) -> StartupDelay {
    if let Some(scheduled) = matching_schedule_time(at, times, tolerance_minutes) {
        let delay = Duration::from_secs(rng.gen_range(0..=random_max.as_secs()));
        info!(
            %scheduled,
            delay = %format_duration(delay),
            "Scheduled launch, applying random delay"
        );
        return StartupDelay::Random { scheduled, delay };
    }

    if login_delay.is_zero() {
        StartupDelay::None
    } else {
        info!(delay = %format_duration(login_delay), "Applying login delay");
        StartupDelay::Login(login_delay)
    }
}
