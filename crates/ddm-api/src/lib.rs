//! Shared vocabulary for ddm-reminder
//!
//! This crate defines the types that cross crate boundaries:
//! - Prompt requests handed to the dialog collaborator, and the outcomes it returns
//! - Policy enums shared by configuration and the core engine
//! - Status and error codes reported to the health snapshot

mod outcome;
mod status;
mod types;

pub use outcome::*;
pub use status::*;
pub use types::*;

/// Current health snapshot schema version
pub const HEALTH_SCHEMA_VERSION: u32 = 1;
