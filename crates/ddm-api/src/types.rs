//! Shared types for ddm-reminder

use serde::{Deserialize, Serialize};

/// What the prompt does once every deferral has been used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedBehavior {
    /// Show the prompt without a usable defer button
    #[default]
    NoRemindButton,
    /// Open the update surface automatically after a delay
    AutoOpenUpdate,
}

impl ExhaustedBehavior {
    /// Parse a configured value. Accepts snake_case and the CamelCase spelling
    /// used by managed preference profiles.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no_remind_button" | "NoRemindButton" => Some(Self::NoRemindButton),
            "auto_open_update" | "AutoOpenUpdate" => Some(Self::AutoOpenUpdate),
            _ => None,
        }
    }
}

/// Screen position of the prompt window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl WindowPosition {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "center" => Some(Self::Center),
            "topleft" => Some(Self::TopLeft),
            "topright" => Some(Self::TopRight),
            "bottomleft" => Some(Self::BottomLeft),
            "bottomright" => Some(Self::BottomRight),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::TopLeft => "topleft",
            Self::TopRight => "topright",
            Self::BottomLeft => "bottomleft",
            Self::BottomRight => "bottomright",
        }
    }
}

/// Fully rendered prompt, ready for the dialog collaborator.
///
/// Everything policy-related is decided before this is built; the presenter
/// only maps fields onto its own flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub title: String,
    pub message: String,
    pub infobox: String,
    pub help_message: String,

    /// Primary action (open the update surface)
    pub button1_text: String,

    /// Defer button; `None` when deferrals are exhausted
    pub button2_text: Option<String>,

    /// Shown as a disabled second button once deferrals are exhausted
    pub button2_disabled_text: Option<String>,

    pub info_button_text: String,

    /// Auto-dismiss timer. A timeout is read as an implicit snooze.
    pub timer_seconds: Option<u64>,

    /// Auto-proceed to open-update after this many seconds (exhausted deferrals)
    pub auto_proceed_seconds: Option<u64>,

    pub blur_screen: bool,

    /// Major version of the target, used to pick an icon
    pub icon_major_version: u64,

    pub window_width: u32,
    pub window_height: u32,
    pub window_position: WindowPosition,

    /// Labels a combined defer/snooze selector reports back in its JSON payload
    pub defer_option_label: String,

    /// `None` when snoozing is not offered
    pub snooze_option_label: Option<String>,
}

impl PromptRequest {
    pub fn can_defer(&self) -> bool {
        self.button2_text.is_some()
    }

    /// A combined defer/snooze selector is shown only while deferring is possible
    pub fn offers_snooze(&self) -> bool {
        self.can_defer() && self.snooze_option_label.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_behavior_parsing() {
        assert_eq!(
            ExhaustedBehavior::parse("AutoOpenUpdate"),
            Some(ExhaustedBehavior::AutoOpenUpdate)
        );
        assert_eq!(
            ExhaustedBehavior::parse("no_remind_button"),
            Some(ExhaustedBehavior::NoRemindButton)
        );
        assert_eq!(ExhaustedBehavior::parse("InvalidBehavior"), None);
    }

    #[test]
    fn window_position_round_trip() {
        for pos in [
            WindowPosition::Center,
            WindowPosition::TopLeft,
            WindowPosition::TopRight,
            WindowPosition::BottomLeft,
            WindowPosition::BottomRight,
        ] {
            assert_eq!(WindowPosition::parse(pos.as_str()), Some(pos));
        }
        assert_eq!(WindowPosition::parse("TopLeft"), Some(WindowPosition::TopLeft));
        assert_eq!(WindowPosition::parse("middle"), None);
    }
}
