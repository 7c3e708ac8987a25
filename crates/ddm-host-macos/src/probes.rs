//! System fact probes backed by macOS command-line tools

use ddm_host_api::{
    AssertionProbe, ConsoleUser, DeviceInfo, HostError, HostResult, UserInfoProbe, VersionProbe,
};
use ddm_util::OsVersion;
use tracing::{debug, warn};

use crate::run_command;

const SW_VERS: &str = "/usr/bin/sw_vers";
const PMSET: &str = "/usr/bin/pmset";
const STAT: &str = "/usr/bin/stat";
const ID: &str = "/usr/bin/id";
const SCUTIL: &str = "/usr/sbin/scutil";
const IOREG: &str = "/usr/sbin/ioreg";

/// Assertion types that mean the display is being kept awake on purpose
const DISPLAY_ASSERTIONS: [&str; 2] = ["NoDisplaySleepAssertion", "PreventUserIdleDisplaySleep"];

/// Processes whose assertions do not indicate a meeting
const IGNORED_ASSERTION_OWNERS: [&str; 1] = ["coreaudiod"];

/// Installed version from `sw_vers -productVersion`
#[derive(Debug, Clone, Copy, Default)]
pub struct SwVersProbe;

impl VersionProbe for SwVersProbe {
    fn installed_version(&self) -> HostResult<OsVersion> {
        let raw = run_command(SW_VERS, &["-productVersion"])?;
        if raw.is_empty() {
            return Err(HostError::Parse("sw_vers returned no version".into()));
        }
        debug!(version = %raw, "Installed macOS version");
        Ok(OsVersion::parse(&raw))
    }
}

/// Display sleep assertions from `pmset -g assertions`
#[derive(Debug, Clone, Copy, Default)]
pub struct PmsetAssertionProbe;

impl AssertionProbe for PmsetAssertionProbe {
    fn display_assertion_active(&self) -> HostResult<bool> {
        let output = run_command(PMSET, &["-g", "assertions"])?;
        Ok(has_display_assertion(&output))
    }
}

/// True when a line holds a display assertion from a process other than
/// the ignored audio daemon
pub fn has_display_assertion(pmset_output: &str) -> bool {
    pmset_output.lines().any(|line| {
        DISPLAY_ASSERTIONS.iter().any(|a| line.contains(a))
            && !IGNORED_ASSERTION_OWNERS.iter().any(|p| line.contains(p))
    })
}

/// Console user and device identity
#[derive(Debug, Clone, Copy, Default)]
pub struct MacUserInfoProbe;

impl UserInfoProbe for MacUserInfoProbe {
    fn console_user(&self) -> HostResult<Option<ConsoleUser>> {
        let username = run_command(STAT, &["-f%Su", "/dev/console"])?;
        if username.is_empty() {
            return Ok(None);
        }

        let full_name = run_command(ID, &["-F", &username]).unwrap_or_else(|e| {
            warn!(error = %e, user = %username, "Could not read full name");
            String::new()
        });

        Ok(Some(ConsoleUser {
            username,
            full_name,
        }))
    }

    fn device_info(&self) -> HostResult<DeviceInfo> {
        let mut info = DeviceInfo::default();

        match run_command(SCUTIL, &["--get", "ComputerName"]) {
            Ok(name) if !name.is_empty() => info.computer_name = name,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Could not read computer name"),
        }

        match run_command(IOREG, &["-c", "IOPlatformExpertDevice", "-d", "2"]) {
            Ok(output) => {
                if let Some(serial) = parse_serial_number(&output) {
                    info.serial_number = serial;
                }
            }
            Err(e) => warn!(error = %e, "Could not read serial number"),
        }

        Ok(info)
    }
}

/// Serial from an `ioreg` line like `"IOPlatformSerialNumber" = "C02XXXX"`
pub fn parse_serial_number(ioreg_output: &str) -> Option<String> {
    let line = ioreg_output
        .lines()
        .find(|l| l.contains("\"IOPlatformSerialNumber\""))?;
    let (_, value) = line.split_once('=')?;
    let serial = value.trim().trim_matches('"').trim();
    (!serial.is_empty()).then(|| serial.to_string())
}

/// Effective user is root
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}
