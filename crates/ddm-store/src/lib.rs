//! Persistence layer for ddm-reminder
//!
//! Provides:
//! - Deferral ledger state (one record per device, rewritten atomically)
//! - Health snapshot for fleet monitoring
//! - File-backed and in-memory stores

mod file;
mod health;
mod ledger;
mod memory;
mod traits;

pub use file::*;
pub use health::*;
pub use ledger::*;
pub use memory::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Atomic replace of {path} failed: {source}")]
    AtomicWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
