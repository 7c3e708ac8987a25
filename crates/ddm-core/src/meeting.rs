//! Waiting out meetings and presentations before prompting

use ddm_host_api::{AssertionProbe, Sleeper};
use ddm_util::format_duration;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of the meeting wait loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingWait {
    /// No assertion at the first check
    Clear,
    /// Assertion cleared after waiting this long
    ClearedAfter(Duration),
    /// Still held after the maximum wait
    TimedOut(Duration),
}

impl MeetingWait {
    pub fn may_proceed(&self) -> bool {
        !matches!(self, Self::TimedOut(_))
    }
}

/// Polls the display assertion probe until it clears or `max_wait` elapses.
///
/// A failed probe reads as "no assertion" so a broken probe never blocks
/// reminders. The last sleep is shortened so the total never exceeds
/// `max_wait`.
pub fn wait_for_meeting_to_end(
    probe: &dyn AssertionProbe,
    sleeper: &dyn Sleeper,
    max_wait: Duration,
    interval: Duration,
) -> MeetingWait {
    if !assertion_held(probe) {
        debug!("No display assertion held");
        return MeetingWait::Clear;
    }

    let interval = interval.max(Duration::from_secs(1));
    info!(
        max_wait = %format_duration(max_wait),
        interval = %format_duration(interval),
        "Display assertion detected, waiting for meeting to end"
    );

    let mut waited = Duration::ZERO;
    while waited < max_wait {
        let step = interval.min(max_wait - waited);
        sleeper.sleep(step);
        waited += step;

        if !assertion_held(probe) {
            info!(waited = %format_duration(waited), "Display assertion cleared");
            return MeetingWait::ClearedAfter(waited);
        }

        debug!(
            remaining = %format_duration(max_wait - waited),
            "Display assertion still held"
        );
    }

    info!(waited = %format_duration(waited), "Display assertion still held after maximum wait");
    MeetingWait::TimedOut(waited)
}

fn assertion_held(probe: &dyn AssertionProbe) -> bool {
    match probe.display_assertion_active() {
        Ok(held) => held,
        Err(e) => {
            warn!(error = %e, "Assertion probe failed, assuming no meeting");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddm_host_api::{HostError, HostResult, MockHost};

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn clear_at_first_check_does_not_sleep() {
        let host = MockHost::new();
        let result = wait_for_meeting_to_end(&host, &host, 75 * MINUTE, 5 * MINUTE);
        assert_eq!(result, MeetingWait::Clear);
        assert!(host.recorded_sleeps().is_empty());
        assert_eq!(host.assertion_check_count(), 1);
    }

    #[test]
    fn clears_after_two_intervals() {
        let host = MockHost::new().with_assertions([true, true, false]);
        let result = wait_for_meeting_to_end(&host, &host, 75 * MINUTE, 5 * MINUTE);
        assert_eq!(result, MeetingWait::ClearedAfter(10 * MINUTE));
        assert!(result.may_proceed());
        assert_eq!(host.recorded_sleeps(), vec![5 * MINUTE, 5 * MINUTE]);
    }

    #[test]
    fn times_out_at_max_wait() {
        let host = MockHost::new().with_assertion_held();
        let result = wait_for_meeting_to_end(&host, &host, 15 * MINUTE, 5 * MINUTE);
        assert_eq!(result, MeetingWait::TimedOut(15 * MINUTE));
        assert!(!result.may_proceed());
        assert_eq!(host.recorded_sleeps().len(), 3);
        // Initial check plus one after each interval
        assert_eq!(host.assertion_check_count(), 4);
    }

    #[test]
    fn last_sleep_is_clamped() {
        let host = MockHost::new().with_assertion_held();
        let result = wait_for_meeting_to_end(&host, &host, 12 * MINUTE, 5 * MINUTE);
        assert_eq!(result, MeetingWait::TimedOut(12 * MINUTE));
        assert_eq!(
            host.recorded_sleeps(),
            vec![5 * MINUTE, 5 * MINUTE, 2 * MINUTE]
        );
    }

    #[test]
    fn zero_max_wait_times_out_immediately() {
        let host = MockHost::new().with_assertion_held();
        let result = wait_for_meeting_to_end(&host, &host, Duration::ZERO, 5 * MINUTE);
        assert_eq!(result, MeetingWait::TimedOut(Duration::ZERO));
        assert!(host.recorded_sleeps().is_empty());
    }

    struct BrokenProbe;

    impl AssertionProbe for BrokenProbe {
        fn display_assertion_active(&self) -> HostResult<bool> {
            Err(HostError::command_failed("pmset", "exit status 1"))
        }
    }

    #[test]
    fn probe_failure_counts_as_clear() {
        let host = MockHost::new();
        let result = wait_for_meeting_to_end(&BrokenProbe, &host, 75 * MINUTE, 5 * MINUTE);
        assert_eq!(result, MeetingWait::Clear);
    }
}
