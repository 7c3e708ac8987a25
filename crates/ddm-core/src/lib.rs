//! Enforcement and deferral state engine for ddm-reminder
//!
//! This crate provides:
//! - Enforcement extraction from the install log, with the padded deadline rule
//! - The persistent deferral ledger (budget, deadline change reset, snooze)
//! - The per-invocation decision procedure and prompt outcome handling
//! - Prompt rendering, meeting wait loop, and startup jitter

mod decision;
mod extractor;
mod jitter;
mod ledger;
mod meeting;
mod outcome;
mod prompt;

pub use decision::*;
pub use extractor::*;
pub use jitter::*;
pub use ledger::*;
pub use meeting::*;
pub use outcome::*;
pub use prompt::*;
