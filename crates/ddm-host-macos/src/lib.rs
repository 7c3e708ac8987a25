//! macOS host adapter for ddm-reminder
//!
//! Provides:
//! - System probes (installed version, display assertions, console user, device identity)
//! - The dialog presenter with its version gate and exit-code decoding
//! - Opening the Software Update pane
//! - Root check

mod adapter;
mod command;
mod dialog;
mod probes;

pub use adapter::*;
pub use command::*;
pub use dialog::*;
pub use probes::*;
