//! JSON file store with atomic replace

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{
    HealthSnapshot, HealthStore, LedgerLoad, LedgerState, LedgerStore, StoreError, StoreResult,
};

/// File-backed store for the ledger and the health snapshot
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    ledger_path: PathBuf,
    health_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(ledger_path: impl Into<PathBuf>, health_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            health_path: health_path.into(),
        }
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn health_path(&self) -> &Path {
        &self.health_path
    }

    /// Where a damaged ledger is moved to
    pub fn quarantine_path(&self) -> PathBuf {
        let mut name = self.ledger_path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }
}

impl LedgerStore for JsonFileStore {
    fn load_ledger(&self) -> StoreResult<LedgerLoad> {
        let content = match fs::read_to_string(&self.ledger_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.ledger_path.display(), "No ledger file yet");
                return Ok(LedgerLoad::Missing);
            }
            Err(e) => {
                return Ok(LedgerLoad::Corrupt {
                    detail: format!("unreadable: {}", e),
                });
            }
        };

        match serde_json::from_str::<LedgerState>(&content) {
            Ok(state) => Ok(LedgerLoad::Loaded(state)),
            Err(e) => Ok(LedgerLoad::Corrupt {
                detail: e.to_string(),
            }),
        }
    }

    fn save_ledger(&self, state: &LedgerState) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.ledger_path, json.as_bytes())
    }

    fn quarantine_ledger(&self) -> StoreResult<()> {
        let target = self.quarantine_path();
        match fs::rename(&self.ledger_path, &target) {
            Ok(()) => {
                warn!(
                    from = %self.ledger_path.display(),
                    to = %target.display(),
                    "Quarantined damaged ledger"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl HealthStore for JsonFileStore {
    fn load_health(&self) -> StoreResult<Option<HealthSnapshot>> {
        match fs::read_to_string(&self.health_path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_health(&self, snapshot: &HealthSnapshot) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        write_atomic(&self.health_path, json.as_bytes())
    }
}

/// Write to a sibling temp file, flush it to disk, then rename over `path`.
///
/// A crash at any point leaves either the old or the new content, never a
/// truncated file.
pub fn write_atomic(path: &Path, content: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    if let Err(rename_error) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::AtomicWrite {
            path: path.display().to_string(),
            source: rename_error,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> JsonFileStore {
        JsonFileStore::new(dir.join("deferral.json"), dir.join("health.json"))
    }

    #[test]
    fn missing_ledger_is_not_an_error() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.load_ledger().unwrap(), LedgerLoad::Missing);
    }

    #[test]
    fn ledger_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let state = LedgerState {
            deferral_count: 2,
            last_deadline: Some(Local.with_ymd_and_hms(2025, 11, 13, 8, 59, 56).unwrap()),
            last_deferral_date: Some(Local.with_ymd_and_hms(2025, 11, 10, 14, 0, 0).unwrap()),
            snooze_until: None,
        };
        store.save_ledger(&state).unwrap();

        assert_eq!(store.load_ledger().unwrap(), LedgerLoad::Loaded(state));
        assert!(!dir.path().join("deferral.tmp").exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir.path().join("nested/state"));
        store.save_ledger(&LedgerState::default()).unwrap();
        assert!(store.ledger_path().exists());
    }

    #[test]
    fn save_replaces_whole_record() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let mut state = LedgerState {
            deferral_count: 5,
            snooze_until: Some(Local.with_ymd_and_hms(2025, 11, 10, 16, 0, 0).unwrap()),
            ..Default::default()
        };
        store.save_ledger(&state).unwrap();

        state.snooze_until = None;
        state.deferral_count = 0;
        store.save_ledger(&state).unwrap();

        assert_eq!(
            store.load_ledger().unwrap(),
            LedgerLoad::Loaded(LedgerState::default())
        );
    }

    #[test]
    fn garbage_is_reported_corrupt_and_quarantined() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.ledger_path(), "{ not json").unwrap();

        assert!(matches!(
            store.load_ledger().unwrap(),
            LedgerLoad::Corrupt { .. }
        ));

        store.quarantine_ledger().unwrap();
        assert!(!store.ledger_path().exists());
        assert!(store.quarantine_path().exists());
        assert_eq!(store.load_ledger().unwrap(), LedgerLoad::Missing);
    }

    #[test]
    fn quarantine_without_file_is_noop() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.quarantine_ledger().unwrap();
    }

    #[test]
    fn health_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.load_health().unwrap().is_none());

        let mut snapshot = HealthSnapshot::default();
        snapshot.ledger_corruption_count = 2;
        snapshot.target_version = Some("15.1".into());
        store.save_health(&snapshot).unwrap();

        let loaded = store.load_health().unwrap().unwrap();
        assert_eq!(loaded.ledger_corruption_count, 2);
        assert_eq!(loaded.target_version.as_deref(), Some("15.1"));
    }
}
