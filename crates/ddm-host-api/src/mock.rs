//! Mock host for testing

use ddm_api::{PromptOutcome, PromptRequest};
use ddm_util::{ManualClock, OsVersion};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    AssertionProbe, ConsoleUser, DeviceInfo, HostCapabilities, HostError, HostResult,
    PromptPresenter, Sleeper, UpdateSurface, UserInfoProbe, VersionProbe,
};

/// Scriptable host for unit and integration tests.
///
/// Clones share state, so a test can hand a clone to the core and inspect
/// the original afterwards.
#[derive(Clone)]
pub struct MockHost {
    /// Installed OS version; `None` makes the probe fail
    pub installed_version: Arc<Mutex<Option<OsVersion>>>,

    /// Assertion results returned in order; once drained, `assertion_default`
    pub assertion_script: Arc<Mutex<VecDeque<bool>>>,
    pub assertion_default: Arc<Mutex<bool>>,
    pub assertion_checks: Arc<Mutex<u32>>,

    pub console_user: Arc<Mutex<Option<ConsoleUser>>>,
    pub device: Arc<Mutex<DeviceInfo>>,

    /// Outcomes returned in order; once drained, `default_outcome`
    pub outcome_script: Arc<Mutex<VecDeque<PromptOutcome>>>,
    pub default_outcome: Arc<Mutex<PromptOutcome>>,
    pub presented: Arc<Mutex<Vec<PromptRequest>>>,

    pub update_surface_opened: Arc<Mutex<u32>>,
    pub fail_update_surface: Arc<Mutex<bool>>,

    pub sleeps: Arc<Mutex<Vec<Duration>>>,

    /// When set, every sleep advances this clock
    pub clock: Arc<Mutex<Option<ManualClock>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            installed_version: Arc::new(Mutex::new(Some(OsVersion::parse("14.6.1")))),
            assertion_script: Arc::new(Mutex::new(VecDeque::new())),
            assertion_default: Arc::new(Mutex::new(false)),
            assertion_checks: Arc::new(Mutex::new(0)),
            console_user: Arc::new(Mutex::new(Some(ConsoleUser {
                username: "jdoe".into(),
                full_name: "Jane Doe".into(),
            }))),
            device: Arc::new(Mutex::new(DeviceInfo {
                computer_name: "Test Mac".into(),
                serial_number: "C02TEST0001".into(),
            })),
            outcome_script: Arc::new(Mutex::new(VecDeque::new())),
            default_outcome: Arc::new(Mutex::new(PromptOutcome::Timeout)),
            presented: Arc::new(Mutex::new(Vec::new())),
            update_surface_opened: Arc::new(Mutex::new(0)),
            fail_update_surface: Arc::new(Mutex::new(false)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            clock: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_installed_version(self, version: &str) -> Self {
        *self.installed_version.lock().unwrap() = Some(OsVersion::parse(version));
        self
    }

    /// Queue assertion probe results, checked in order
    pub fn with_assertions(self, script: impl IntoIterator<Item = bool>) -> Self {
        self.assertion_script.lock().unwrap().extend(script);
        self
    }

    /// Keep the assertion active forever
    pub fn with_assertion_held(self) -> Self {
        *self.assertion_default.lock().unwrap() = true;
        self
    }

    pub fn with_outcome(self, outcome: PromptOutcome) -> Self {
        self.queue_outcome(outcome);
        self
    }

    /// Queue an outcome on a shared mock
    pub fn queue_outcome(&self, outcome: PromptOutcome) {
        self.outcome_script.lock().unwrap().push_back(outcome);
    }

    pub fn set_assertion_held(&self, held: bool) {
        *self.assertion_default.lock().unwrap() = held;
    }

    pub fn with_console_user(self, user: Option<ConsoleUser>) -> Self {
        *self.console_user.lock().unwrap() = user;
        self
    }

    /// Let sleeps move a manual clock forward
    pub fn with_clock(self, clock: ManualClock) -> Self {
        *self.clock.lock().unwrap() = Some(clock);
        self
    }

    pub fn presented_prompts(&self) -> Vec<PromptRequest> {
        self.presented.lock().unwrap().clone()
    }

    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }

    pub fn assertion_check_count(&self) -> u32 {
        *self.assertion_checks.lock().unwrap()
    }

    pub fn update_surface_open_count(&self) -> u32 {
        *self.update_surface_opened.lock().unwrap()
    }

    /// Box clones of this mock into a capability bundle
    pub fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            version: Box::new(self.clone()),
            assertions: Box::new(self.clone()),
            users: Box::new(self.clone()),
            presenter: Box::new(self.clone()),
            update_surface: Box::new(self.clone()),
            sleeper: Box::new(self.clone()),
        }
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionProbe for MockHost {
    fn installed_version(&self) -> HostResult<OsVersion> {
        self.installed_version
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HostError::command_failed("sw_vers", "mock version probe failure"))
    }
}

impl AssertionProbe for MockHost {
    fn display_assertion_active(&self) -> HostResult<bool> {
        *self.assertion_checks.lock().unwrap() += 1;
        let scripted = self.assertion_script.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or(*self.assertion_default.lock().unwrap()))
    }
}

impl UserInfoProbe for MockHost {
    fn console_user(&self) -> HostResult<Option<ConsoleUser>> {
        Ok(self.console_user.lock().unwrap().clone())
    }

    fn device_info(&self) -> HostResult<DeviceInfo> {
        Ok(self.device.lock().unwrap().clone())
    }
}

impl PromptPresenter for MockHost {
    fn present(&self, request: &PromptRequest) -> PromptOutcome {
        self.presented.lock().unwrap().push(request.clone());
        let scripted = self.outcome_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default_outcome.lock().unwrap().clone())
    }
}

impl UpdateSurface for MockHost {
    fn open_software_update(&self) -> HostResult<()> {
        if *self.fail_update_surface.lock().unwrap() {
            return Err(HostError::command_failed("open", "mock update surface failure"));
        }
        *self.update_surface_opened.lock().unwrap() += 1;
        Ok(())
    }
}

impl Sleeper for MockHost {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        if let Some(clock) = self.clock.lock().unwrap().as_ref() {
            clock.advance(duration);
        }
    }
}
