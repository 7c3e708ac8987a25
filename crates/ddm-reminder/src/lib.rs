//! Wiring for the ddm-reminder binary
//!
//! Provides:
//! - Logging setup with a reloadable filter
//! - Preflight checks (root, console user)
//! - Health snapshot reporting for one invocation

mod health;
mod logging;
mod preflight;

pub use health::*;
pub use logging::*;
pub use preflight::*;
