//! In-memory store for tests and dry runs

use std::sync::{Arc, Mutex};

use crate::{
    HealthSnapshot, HealthStore, LedgerLoad, LedgerState, LedgerStore, StoreError, StoreResult,
};

/// Keeps the ledger as serialized JSON so damaged content can be simulated.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledger_json: Arc<Mutex<Option<String>>>,
    quarantined: Arc<Mutex<Vec<String>>>,
    health: Arc<Mutex<Option<HealthSnapshot>>>,
    ledger_writes: Arc<Mutex<u32>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary ledger content (valid or not)
    pub fn with_raw_ledger(content: impl Into<String>) -> Self {
        let store = Self::default();
        *store.ledger_json.lock().unwrap() = Some(content.into());
        store
    }

    /// Make every subsequent save fail
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn ledger_write_count(&self) -> u32 {
        *self.ledger_writes.lock().unwrap()
    }

    pub fn quarantined(&self) -> Vec<String> {
        self.quarantined.lock().unwrap().clone()
    }

    /// Current ledger, or empty state when missing or damaged
    pub fn current_ledger(&self) -> LedgerState {
        match self.load_ledger() {
            Ok(LedgerLoad::Loaded(state)) => state,
            _ => LedgerState::default(),
        }
    }

    pub fn has_ledger(&self) -> bool {
        self.ledger_json.lock().unwrap().is_some()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "memory store configured to fail writes",
            )));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn load_ledger(&self) -> StoreResult<LedgerLoad> {
        let guard = self.ledger_json.lock().unwrap();
        let Some(content) = guard.as_ref() else {
            return Ok(LedgerLoad::Missing);
        };
        Ok(match serde_json::from_str(content) {
            Ok(state) => LedgerLoad::Loaded(state),
            Err(e) => LedgerLoad::Corrupt {
                detail: e.to_string(),
            },
        })
    }

    fn save_ledger(&self, state: &LedgerState) -> StoreResult<()> {
        self.check_writable()?;
        let json = serde_json::to_string(state)?;
        *self.ledger_json.lock().unwrap() = Some(json);
        *self.ledger_writes.lock().unwrap() += 1;
        Ok(())
    }

    fn quarantine_ledger(&self) -> StoreResult<()> {
        if let Some(content) = self.ledger_json.lock().unwrap().take() {
            self.quarantined.lock().unwrap().push(content);
        }
        Ok(())
    }
}

impl HealthStore for MemoryStore {
    fn load_health(&self) -> StoreResult<Option<HealthSnapshot>> {
        Ok(self.health.lock().unwrap().clone())
    }

    fn save_health(&self, snapshot: &HealthSnapshot) -> StoreResult<()> {
        self.check_writable()?;
        *self.health.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_garbage_reads_as_corrupt() {
        let store = MemoryStore::with_raw_ledger("\u{0}\u{1}garbage");
        assert!(matches!(
            store.load_ledger().unwrap(),
            LedgerLoad::Corrupt { .. }
        ));
        store.quarantine_ledger().unwrap();
        assert_eq!(store.load_ledger().unwrap(), LedgerLoad::Missing);
        assert_eq!(store.quarantined().len(), 1);
    }

    #[test]
    fn failing_writes() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        assert!(store.save_ledger(&LedgerState::default()).is_err());
        assert_eq!(store.ledger_write_count(), 0);
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone
            .save_ledger(&LedgerState {
                deferral_count: 4,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.current_ledger().deferral_count, 4);
    }
}
