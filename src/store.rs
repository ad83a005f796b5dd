//! Persistent key-value storage behind the draft store.
//!
//! The storage backend is an injected trait so the file implementation can
//! be swapped for an in-memory fake in tests. The persisted blob is a whole
//! value rewritten on every save; a second running instance would silently
//! clobber it, which is an accepted limitation of the single-profile design.

use crate::migrate::{self, MigrationNotes};
use crate::schema::{HistoryEntry, ReportRecord};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Well-known key holding the history ledger. Early app versions stored a
/// single draft object under the same key; `load` sniffs the shape.
pub const LEDGER_KEY: &str = "kokurikulum_report_draft";

/// Key holding the working draft between sessions.
pub const DRAFT_KEY: &str = "draft_semasa";

/// Env override for the data directory, used by tests and portable setups.
pub const DATA_DIR_ENV: &str = "LAPOR_DATA_DIR";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("saved report data under '{key}' is corrupt: {reason}")]
    CorruptDraft { key: String, reason: String },
    #[error("failed to read '{key}' from storage: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write '{key}' to storage: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize '{key}': {source}")]
    SerializeFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no data directory available (set {DATA_DIR_ENV})")]
    NoDataDir,
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::CorruptDraft { .. })
    }
}

/// Minimal key-value contract the draft store persists through.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// File-backed storage: one `<key>.json` document per key under a data root.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open storage at the platform data directory, honoring the env
    /// override.
    pub fn open_default() -> Result<FileStorage, StoreError> {
        let root = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir().ok_or(StoreError::NoDataDir)?.join("lapor"),
        };
        Ok(FileStorage::at(&root))
    }

    pub fn at(root: &Path) -> FileStorage {
        FileStorage {
            root: root.to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::ReadFailed {
                key: key.to_string(),
                source: err,
            }),
        }
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_failed = |source| StoreError::WriteFailed {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(write_failed)?;
        let path = self.key_path(key);
        // Stage then rename so a failed write never leaves a truncated blob.
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(write_failed)?;
        fs::rename(&tmp, &path).map_err(write_failed)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::WriteFailed {
                key: key.to_string(),
                source: err,
            }),
        }
    }
}

/// In-memory storage fake used across the unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    entries: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn seeded(key: &str, value: &str) -> MemoryStorage {
        let mut storage = MemoryStorage::default();
        storage.entries.insert(key.to_string(), value.to_string());
        storage
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Everything `load` hands back to the shell: the working draft, the saved
/// history, and any notes from migrating an older persisted shape.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub draft: ReportRecord,
    pub history: Vec<HistoryEntry>,
    pub notes: MigrationNotes,
    /// Set when the blob was the legacy single-draft object. The caller
    /// should re-persist in the canonical shapes so the stale blob cannot
    /// shadow later draft edits.
    pub migrated_legacy: bool,
}

/// Translates between in-memory state and the persisted blobs.
pub struct DraftStore<S: Storage> {
    storage: S,
}

impl<S: Storage> DraftStore<S> {
    pub fn new(storage: S) -> DraftStore<S> {
        DraftStore { storage }
    }

    /// Read the persisted state, migrating whichever shape is found.
    ///
    /// An absent blob is an empty ledger, not an error. A present blob that
    /// cannot be recognized fails with `CorruptDraft`; callers that want the
    /// documented fall-back behavior should go through
    /// [`DraftStore::load_or_default`].
    pub fn load(&self) -> Result<LoadedState, StoreError> {
        let mut notes = MigrationNotes::default();
        let (migrated_draft, history) = self.load_main_blob(&mut notes)?;

        // A legacy single-draft blob becomes the working draft; otherwise the
        // draft lives under its own key.
        let migrated_legacy = migrated_draft.is_some();
        let draft = match migrated_draft {
            Some(record) => record,
            None => self.load_working_draft(&mut notes)?,
        };

        Ok(LoadedState {
            draft,
            history,
            notes,
            migrated_legacy,
        })
    }

    /// `load`, recovering from corrupt blobs with schema defaults.
    ///
    /// Recovery is per key, so a corrupt ledger blob does not discard a
    /// healthy working draft (or the other way around). Corruption is logged
    /// and never crashes the caller; persistence failures still propagate.
    pub fn load_or_default(&self) -> Result<LoadedState, StoreError> {
        match self.load() {
            Ok(state) => Ok(state),
            Err(err) if err.is_corrupt() => {
                tracing::warn!(%err, "recovering from unreadable saved report data");
                self.load_salvaging()
            }
            Err(err) => Err(err),
        }
    }

    fn load_salvaging(&self) -> Result<LoadedState, StoreError> {
        let mut notes = MigrationNotes::default();
        let (migrated_draft, history) = match self.load_main_blob(&mut notes) {
            Ok(loaded) => loaded,
            Err(err) if err.is_corrupt() => {
                tracing::warn!(%err, "discarding unreadable saved history");
                (None, Vec::new())
            }
            Err(err) => return Err(err),
        };
        let migrated_legacy = migrated_draft.is_some();
        let draft = match migrated_draft {
            Some(record) => record,
            None => match self.load_working_draft(&mut notes) {
                Ok(record) => record,
                Err(err) if err.is_corrupt() => {
                    tracing::warn!(%err, "discarding unreadable working draft");
                    ReportRecord::default()
                }
                Err(err) => return Err(err),
            },
        };
        Ok(LoadedState {
            draft,
            history,
            notes,
            migrated_legacy,
        })
    }

    /// Read and shape-sniff the well-known blob. Returns the migrated legacy
    /// draft (if the blob was the old single-draft object) and the history.
    fn load_main_blob(
        &self,
        notes: &mut MigrationNotes,
    ) -> Result<(Option<ReportRecord>, Vec<HistoryEntry>), StoreError> {
        match self.storage.get(LEDGER_KEY)? {
            None => Ok((None, Vec::new())),
            Some(raw) => {
                let value: Value =
                    serde_json::from_str(&raw).map_err(|err| StoreError::CorruptDraft {
                        key: LEDGER_KEY.to_string(),
                        reason: err.to_string(),
                    })?;
                migrate::state_from_value(&value, notes).map_err(|reason| {
                    StoreError::CorruptDraft {
                        key: LEDGER_KEY.to_string(),
                        reason,
                    }
                })
            }
        }
    }

    fn load_working_draft(&self, notes: &mut MigrationNotes) -> Result<ReportRecord, StoreError> {
        match self.storage.get(DRAFT_KEY)? {
            None => Ok(ReportRecord::default()),
            Some(raw) => {
                let value: Value =
                    serde_json::from_str(&raw).map_err(|err| StoreError::CorruptDraft {
                        key: DRAFT_KEY.to_string(),
                        reason: err.to_string(),
                    })?;
                migrate::record_from_value(&value, notes).ok_or_else(|| {
                    StoreError::CorruptDraft {
                        key: DRAFT_KEY.to_string(),
                        reason: "working draft is not a JSON object".to_string(),
                    }
                })
            }
        }
    }

    /// Persist the working draft. Whole-value overwrite, last writer wins.
    pub fn save_draft(&mut self, record: &ReportRecord) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string_pretty(record).map_err(|err| StoreError::SerializeFailed {
                key: DRAFT_KEY.to_string(),
                source: err,
            })?;
        self.storage.put(DRAFT_KEY, &raw)
    }

    /// Persist the full history sequence in the canonical ledger shape.
    pub fn save_history(&mut self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string_pretty(entries).map_err(|err| StoreError::SerializeFailed {
                key: LEDGER_KEY.to_string(),
                source: err,
            })?;
        self.storage.put(LEDGER_KEY, &raw)
    }

    /// Drop the stored working draft; the next load starts from defaults.
    pub fn reset_draft(&mut self) -> Result<(), StoreError> {
        self.storage.remove(DRAFT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ReportRecord {
        ReportRecord {
            unit_name: "Pengakap".to_string(),
            program: "Perjumpaan Pengakap Bil. 1".to_string(),
            organiser: "Unit Beruniform".to_string(),
            date: "2026-01-14".to_string(),
            time: "2:00 PM - 4:00 PM".to_string(),
            attendee_count: "32".to_string(),
            absentee_count: "3".to_string(),
            advisor_name: "Cikgu Roslan".to_string(),
            narrative: "Latihan ikatan dan simpulan.".to_string(),
            preparer_name: "Cikgu Aminah".to_string(),
            preparer_role: "Guru Penasihat".to_string(),
            images: vec!["data:image/jpeg;base64,AAAA".to_string()],
        }
    }

    #[test]
    fn empty_storage_loads_defaults() {
        let store = DraftStore::new(MemoryStorage::default());
        let state = store.load().expect("load");
        assert_eq!(state.draft, ReportRecord::default());
        assert!(state.history.is_empty());
        assert!(state.notes.is_empty());
    }

    #[test]
    fn draft_round_trips_field_for_field() {
        let mut store = DraftStore::new(MemoryStorage::default());
        let record = sample_record();
        store.save_draft(&record).expect("save draft");
        let state = store.load().expect("load");
        assert_eq!(state.draft, record);
    }

    #[test]
    fn empty_images_survive_the_round_trip() {
        let mut store = DraftStore::new(MemoryStorage::default());
        let record = ReportRecord {
            images: Vec::new(),
            ..sample_record()
        };
        store.save_draft(&record).expect("save draft");
        assert_eq!(store.load().expect("load").draft.images, Vec::<String>::new());
    }

    #[test]
    fn history_round_trips_in_order() {
        let mut store = DraftStore::new(MemoryStorage::default());
        let entries = vec![
            HistoryEntry {
                id: "2".to_string(),
                saved_at: "2026-01-21T08:00:00Z".to_string(),
                record: sample_record(),
            },
            HistoryEntry {
                id: "1".to_string(),
                saved_at: "2026-01-14T08:00:00Z".to_string(),
                record: ReportRecord::default(),
            },
        ];
        store.save_history(&entries).expect("save history");
        let state = store.load().expect("load");
        assert_eq!(state.history, entries);
    }

    #[test]
    fn unparseable_ledger_blob_is_corrupt_not_fatal() {
        let storage = MemoryStorage::seeded(LEDGER_KEY, "not json at all");
        let store = DraftStore::new(storage);
        let err = store.load().expect_err("corrupt blob must not load");
        assert!(err.is_corrupt());

        let state = store.load_or_default().expect("recovery");
        assert_eq!(state.draft, ReportRecord::default());
        assert!(state.history.is_empty());
    }

    #[test]
    fn recovery_salvages_the_healthy_key() {
        let mut storage = MemoryStorage::seeded(LEDGER_KEY, "{{{");
        storage
            .put(DRAFT_KEY, r#"{ "program": "Sukan Tara" }"#)
            .expect("seed draft");
        let store = DraftStore::new(storage);
        let state = store.load_or_default().expect("recovery");
        assert_eq!(state.draft.program, "Sukan Tara");
        assert!(state.history.is_empty());
    }

    #[test]
    fn scalar_blob_is_corrupt() {
        let storage = MemoryStorage::seeded(LEDGER_KEY, "42");
        let err = DraftStore::new(storage)
            .load()
            .expect_err("scalar blob must not load");
        assert!(err.is_corrupt());
    }

    #[test]
    fn legacy_single_draft_blob_becomes_the_working_draft() {
        let legacy = r#"{
            "program": "Perjumpaan Pengakap",
            "anjuran": "Unit Beruniform",
            "tarikh": "2026-01-14",
            "masa": "2:00 PM - 4:00 PM",
            "hadir": "32",
            "tidakHadir": "3",
            "guruPenasihat": "Cikgu Roslan",
            "laporan": "Latihan ikatan.",
            "namaPenyedia": "Cikgu Aminah",
            "jawatanPenyedia": "Guru Penasihat",
            "images": [],
            "phonePK": "+60 13-257 6050"
        }"#;
        let store = DraftStore::new(MemoryStorage::seeded(LEDGER_KEY, legacy));
        let state = store.load().expect("load legacy blob");
        assert_eq!(state.draft.program, "Perjumpaan Pengakap");
        assert_eq!(state.draft.unit_name, "");
        assert!(state.history.is_empty());
        assert!(state.migrated_legacy);
        assert!(!state.notes.is_empty());
    }

    #[test]
    fn reset_draft_returns_to_defaults() {
        let mut store = DraftStore::new(MemoryStorage::default());
        store.save_draft(&sample_record()).expect("save draft");
        store.reset_draft().expect("reset");
        assert_eq!(store.load().expect("load").draft, ReportRecord::default());
    }

    #[test]
    fn file_storage_round_trips_and_tolerates_missing_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut storage = FileStorage::at(dir.path());
        assert!(storage.get("absent").expect("get absent").is_none());
        storage.put("k", "{\"a\":1}").expect("put");
        assert_eq!(storage.get("k").expect("get").as_deref(), Some("{\"a\":1}"));
        storage.remove("k").expect("remove");
        storage.remove("k").expect("remove twice");
        assert!(storage.get("k").expect("get removed").is_none());
    }
}
