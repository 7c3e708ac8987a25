//! Store trait definitions

use crate::{HealthSnapshot, LedgerLoad, LedgerState, StoreResult};

/// Durable home of the deferral ledger
pub trait LedgerStore {
    /// Read the ledger, distinguishing a first run from a damaged file
    fn load_ledger(&self) -> StoreResult<LedgerLoad>;

    /// Replace the whole ledger; must be atomic (last successful write wins)
    fn save_ledger(&self, state: &LedgerState) -> StoreResult<()>;

    /// Move a damaged ledger aside so it can be inspected later
    fn quarantine_ledger(&self) -> StoreResult<()>;
}

/// Durable home of the health snapshot
pub trait HealthStore {
    fn load_health(&self) -> StoreResult<Option<HealthSnapshot>>;

    fn save_health(&self, snapshot: &HealthSnapshot) -> StoreResult<()>;
}
