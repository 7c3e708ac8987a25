//! Capability bundle for a real macOS host

use ddm_host_api::{HostCapabilities, ThreadSleeper};
use ddm_util::OsVersion;
use std::path::PathBuf;

use crate::{DialogPresenter, MacUserInfoProbe, PmsetAssertionProbe, SoftwareUpdatePane, SwVersProbe};

/// Capabilities backed by the system tools and the dialog binary at `dialog_binary`
pub fn macos_capabilities(dialog_binary: impl Into<PathBuf>, dialog_min_version: OsVersion) -> HostCapabilities {
    HostCapabilities {
        version: Box::new(SwVersProbe),
        assertions: Box::new(PmsetAssertionProbe),
        users: Box::new(MacUserInfoProbe),
        presenter: Box::new(DialogPresenter::new(dialog_binary, dialog_min_version)),
        update_surface: Box::new(SoftwareUpdatePane),
        sleeper: Box::new(ThreadSleeper),
    }
}
