//! Prompt presenter backed by the swiftDialog binary

use ddm_api::{PromptOutcome, PromptRequest, SelectorPayload, WindowPosition};
use ddm_host_api::{HostResult, PromptPresenter, UpdateSurface};
use ddm_util::OsVersion;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{capture, run_command};

const OPEN: &str = "/usr/bin/open";
const SOFTWARE_UPDATE_URL: &str = "x-apple.systempreferences:com.apple.preferences.softwareupdate";

/// Title of the combined defer/snooze selector
const SELECT_TITLE: &str = "Remind me";

/// Presents prompts with the dialog binary and decodes its answer
#[derive(Debug, Clone)]
pub struct DialogPresenter {
    binary: PathBuf,
    min_version: OsVersion,
}

impl DialogPresenter {
    pub fn new(binary: impl Into<PathBuf>, min_version: OsVersion) -> Self {
        Self {
            binary: binary.into(),
            min_version,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Installed dialog version, `None` when it cannot be determined
    pub fn installed_version(&self) -> Option<OsVersion> {
        match run_command(&self.binary, &["--version"]) {
            Ok(raw) if !raw.is_empty() => Some(OsVersion::parse(&raw)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Could not read dialog version");
                None
            }
        }
    }

    /// Binary present and recent enough
    pub fn check_installed(&self) -> Result<(), String> {
        if !self.binary.exists() {
            return Err(format!("dialog not found at {}", self.binary.display()));
        }

        match self.installed_version() {
            Some(installed) if installed.is_older_than(&self.min_version) => Err(format!(
                "dialog version {} below minimum {}",
                installed, self.min_version
            )),
            Some(installed) => {
                debug!(%installed, minimum = %self.min_version, "dialog version ok");
                Ok(())
            }
            // Unknown version is allowed through; the run itself will tell
            None => Ok(()),
        }
    }
}

/// Command-line arguments for a prompt
pub fn dialog_arguments(request: &PromptRequest) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut push = |flag: &str, value: Option<String>| {
        args.push(flag.to_string());
        if let Some(value) = value {
            args.push(value);
        }
    };

    push("--title", Some(request.title.clone()));
    push("--message", Some(request.message.clone()));
    push("--infobox", Some(request.infobox.clone()));
    push("--iconalttext", Some(format!("macOS {}", request.icon_major_version)));
    push("--button1text", Some(request.button1_text.clone()));

    if let Some(text) = &request.button2_text {
        push("--button2text", Some(text.clone()));
    } else if let Some(text) = &request.button2_disabled_text {
        push("--button2text", Some(text.clone()));
        push("--button2disabled", None);
    }

    push("--infobuttontext", Some(request.info_button_text.clone()));
    push("--helpmessage", Some(request.help_message.clone()));

    if let Some(snooze) = request.snooze_option_label.as_ref().filter(|_| request.offers_snooze()) {
        push("--selecttitle", Some(SELECT_TITLE.to_string()));
        push(
            "--selectvalues",
            Some(format!("{},{}", request.defer_option_label, snooze)),
        );
        push("--selectdefault", Some(request.defer_option_label.clone()));
        push("--json", None);
    }

    if let Some(seconds) = request.auto_proceed_seconds.or(request.timer_seconds) {
        push("--timer", Some(seconds.to_string()));
        if request.auto_proceed_seconds.is_none() {
            push("--hidetimerbar", None);
        }
    }

    push("--width", Some(request.window_width.to_string()));
    push("--height", Some(request.window_height.to_string()));
    if request.window_position != WindowPosition::Center {
        push("--position", Some(request.window_position.as_str().to_string()));
    }
    push("--messagefont", Some("size=14".to_string()));

    if request.blur_screen {
        push("--blurscreen", None);
    }
    push("--ontop", None);

    args
}

impl PromptPresenter for DialogPresenter {
    fn present(&self, request: &PromptRequest) -> PromptOutcome {
        if let Err(detail) = self.check_installed() {
            return PromptOutcome::Error(detail);
        }

        let args = dialog_arguments(request);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = match capture(&self.binary, &arg_refs) {
            Ok(output) => output,
            Err(e) => return PromptOutcome::Error(e.to_string()),
        };

        let Some(code) = output.status.code() else {
            return PromptOutcome::Error("dialog terminated by signal".into());
        };
        info!(exit_code = code, "dialog exited");

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = SelectorPayload::parse(&stdout);
        let snooze_label = request.snooze_option_label.as_deref().unwrap_or_default();
        PromptOutcome::decode(
            code,
            payload.as_ref().filter(|_| request.offers_snooze()),
            snooze_label,
        )
    }
}

/// Opens the Software Update pane in System Settings
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareUpdatePane;

impl UpdateSurface for SoftwareUpdatePane {
    fn open_software_update(&self) -> HostResult<()> {
        run_command(OPEN, &[SOFTWARE_UPDATE_URL])?;
        info!("Opened Software Update");
        Ok(())
    }
}
