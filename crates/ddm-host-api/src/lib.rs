//! Host capability interfaces for ddm-reminder
//!
//! This crate defines the capability-based interface between the reminder
//! core and platform-specific implementations. It contains no platform code
//! itself. Every system fact the core needs (installed version, display
//! assertions, console user) and every side effect it triggers (prompt,
//! update surface, sleeping) goes through one of these traits.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
