//! Shared utilities for ddm-reminder
//!
//! This crate provides:
//! - Run identifiers for correlating one scheduler invocation
//! - Time utilities (mockable wall clock, schedule times, deadline formatting)
//! - Dotted OS version parsing and comparison
//! - Default paths for configuration, state, and logs

mod ids;
mod paths;
mod time;
mod version;

pub use ids::*;
pub use paths::*;
pub use time::*;
pub use version::*;
