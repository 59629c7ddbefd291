//! Local persistence of the six collections and the retention state.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SyncResult;
use crate::reconcile::{ReconcileMode, ReconcileSummary, reconcile};
use crate::record::{Collection, Payload, Record};
use crate::retention::{AutoBackupLedger, ExportCounter};

const EXPORT_COUNTER_FILE: &str = "export_counter.json";
const AUTO_BACKUP_FILE: &str = "auto_backup.json";

/// Load/save access to the locally persisted roster.
pub trait LocalStore {
    fn load_collection(&self, collection: Collection) -> SyncResult<Vec<Record>>;

    fn save_collection(&self, collection: Collection, records: &[Record]) -> SyncResult<()>;

    fn load_export_counter(&self) -> SyncResult<ExportCounter>;

    fn save_export_counter(&self, counter: &ExportCounter) -> SyncResult<()>;

    fn load_ledger(&self) -> SyncResult<AutoBackupLedger>;

    fn save_ledger(&self, ledger: &AutoBackupLedger) -> SyncResult<()>;

    fn load_payload(&self) -> SyncResult<Payload> {
        let mut payload = Payload::default();
        for collection in Collection::ALL {
            *payload.collection_mut(collection) = self.load_collection(collection)?;
        }
        Ok(payload)
    }

    fn save_payload(&self, payload: &Payload) -> SyncResult<()> {
        for collection in Collection::ALL {
            self.save_collection(collection, payload.collection(collection))?;
        }
        Ok(())
    }
}

/// Result of reconciling an incoming payload into a local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub summary: ReconcileSummary,
    /// False when the reconciled payload equals what was already stored.
    pub written: bool,
}

/// Reconcile `incoming` into the roster held by `store`.
///
/// The result is saved whenever it differs from the stored payload in any
/// way, including field edits on existing ids and reordering.
pub fn apply_incoming<S: LocalStore + ?Sized>(
    store: &S,
    incoming: &Payload,
    mode: ReconcileMode,
) -> SyncResult<Applied> {
    let local = store.load_payload()?;
    let reconciled = reconcile(&local, incoming, mode);
    let summary = ReconcileSummary::between(&local, &reconciled);

    let written = reconciled != local;
    if written {
        store.save_payload(&reconciled)?;
    }

    Ok(Applied { summary, written })
}

/// One pretty-printed JSON file per collection inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonDirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.key()))
    }

    fn read_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> SyncResult<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> SyncResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

impl LocalStore for JsonDirStore {
    fn load_collection(&self, collection: Collection) -> SyncResult<Vec<Record>> {
        self.read_or_default(&self.collection_path(collection))
    }

    fn save_collection(&self, collection: Collection, records: &[Record]) -> SyncResult<()> {
        self.write(&self.collection_path(collection), records)
    }

    fn load_export_counter(&self) -> SyncResult<ExportCounter> {
        self.read_or_default(&self.dir.join(EXPORT_COUNTER_FILE))
    }

    fn save_export_counter(&self, counter: &ExportCounter) -> SyncResult<()> {
        self.write(&self.dir.join(EXPORT_COUNTER_FILE), counter)
    }

    fn load_ledger(&self) -> SyncResult<AutoBackupLedger> {
        self.read_or_default(&self.dir.join(AUTO_BACKUP_FILE))
    }

    fn save_ledger(&self, ledger: &AutoBackupLedger) -> SyncResult<()> {
        self.write(&self.dir.join(AUTO_BACKUP_FILE), ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_directory_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path().join("data"));

        assert!(store.load_payload().unwrap().is_empty());
        assert_eq!(store.load_export_counter().unwrap().count, 0);
        assert!(store.load_ledger().unwrap().last_run_at.is_none());
    }

    #[test]
    fn test_payload_persists_per_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());

        let payload = Payload {
            staff: vec![Record::new("s1").with_field("name", "Ada")],
            on_call_assignments: vec![Record::new("c1").with_field("date", "2025-02-03")],
            ..Default::default()
        };
        store.save_payload(&payload).unwrap();

        assert!(dir.path().join("staff.json").exists());
        assert!(dir.path().join("onCallAssignments.json").exists());
        assert_eq!(store.load_payload().unwrap(), payload);
    }

    #[test]
    fn test_replace_stores_field_changes_on_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        store
            .save_payload(&Payload {
                staff: vec![Record::new("a").with_field("name", "Old")],
                ..Default::default()
            })
            .unwrap();
        let incoming = Payload {
            staff: vec![Record::new("a").with_field("name", "New")],
            ..Default::default()
        };

        let applied = apply_incoming(&store, &incoming, ReconcileMode::Replace).unwrap();

        assert!(applied.written);
        assert_eq!(applied.summary.totals(), (0, 1, 0));
        assert_eq!(store.load_payload().unwrap(), incoming);
    }

    #[test]
    fn test_replace_stores_reordered_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        store
            .save_payload(&Payload {
                staff: vec![Record::new("a"), Record::new("b")],
                ..Default::default()
            })
            .unwrap();
        let incoming = Payload {
            staff: vec![Record::new("b"), Record::new("a")],
            ..Default::default()
        };

        let applied = apply_incoming(&store, &incoming, ReconcileMode::Replace).unwrap();

        assert!(applied.summary.is_empty());
        assert!(applied.written);
        assert_eq!(store.load_payload().unwrap().staff, incoming.staff);
    }

    #[test]
    fn test_merge_with_nothing_new_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        let local = Payload {
            staff: vec![Record::new("a").with_field("name", "Local")],
            ..Default::default()
        };
        store.save_payload(&local).unwrap();
        let incoming = Payload {
            staff: vec![Record::new("a").with_field("name", "Remote")],
            ..Default::default()
        };

        let applied = apply_incoming(&store, &incoming, ReconcileMode::Merge).unwrap();

        assert!(!applied.written);
        assert_eq!(store.load_payload().unwrap(), local);
    }

    #[test]
    fn test_export_counter_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());

        let mut counter = store.load_export_counter().unwrap();
        counter.record_export();
        counter.record_export();
        store.save_export_counter(&counter).unwrap();

        assert_eq!(store.load_export_counter().unwrap().count, 2);
    }
}
