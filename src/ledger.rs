//! History ledger: the ordered collection of saved report snapshots.
//!
//! Insertion order is canonical: entries are kept newest-first as appended
//! and never re-sorted by timestamp. Identity generation sits behind
//! `EntryStamper` so tests can supply deterministic ids.

use crate::schema::{HistoryEntry, ReportRecord};
use crate::store::{DraftStore, Storage, StoreError};
use chrono::{SecondsFormat, Utc};

/// Fresh identity for a snapshot: a ledger-unique id and the save time.
pub struct EntryStamp {
    pub id: String,
    pub saved_at: String,
}

pub trait EntryStamper {
    fn stamp(&mut self) -> EntryStamp;
}

/// Millisecond-clock-derived ids with a sequence suffix when two appends
/// land in the same tick.
#[derive(Default)]
pub struct SystemStamper {
    last_millis: i64,
    sequence: u32,
}

impl SystemStamper {
    pub fn new() -> SystemStamper {
        SystemStamper::default()
    }

    fn stamp_at(&mut self, millis: i64, saved_at: String) -> EntryStamp {
        if millis <= self.last_millis {
            // Same tick, or a clock that stepped backwards; keep ids
            // monotonic off the last observed millisecond.
            self.sequence += 1;
        } else {
            self.last_millis = millis;
            self.sequence = 0;
        }
        let id = if self.sequence == 0 {
            self.last_millis.to_string()
        } else {
            format!("{}-{}", self.last_millis, self.sequence)
        };
        EntryStamp { id, saved_at }
    }
}

impl EntryStamper for SystemStamper {
    fn stamp(&mut self) -> EntryStamp {
        let now = Utc::now();
        self.stamp_at(
            now.timestamp_millis(),
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

/// The in-memory ledger, persisted through the draft store on every change.
pub struct HistoryLedger<T: EntryStamper> {
    entries: Vec<HistoryEntry>,
    stamper: T,
}

/// The ledger as the shell runs it, stamped off the system clock.
pub type SystemLedger = HistoryLedger<SystemStamper>;

impl HistoryLedger<SystemStamper> {
    pub fn new(entries: Vec<HistoryEntry>) -> HistoryLedger<SystemStamper> {
        HistoryLedger::with_stamper(entries, SystemStamper::new())
    }
}

impl<T: EntryStamper> HistoryLedger<T> {
    pub fn with_stamper(entries: Vec<HistoryEntry>, stamper: T) -> HistoryLedger<T> {
        HistoryLedger { entries, stamper }
    }

    /// Snapshot a record into a new entry and persist the full sequence.
    ///
    /// Content is never validated here; an all-empty record is a valid save.
    /// The in-memory sequence is updated before the write is issued, so on a
    /// persistence failure the entry survives for the session while the
    /// error propagates.
    pub fn append<S: Storage>(
        &mut self,
        record: &ReportRecord,
        store: &mut DraftStore<S>,
    ) -> Result<&HistoryEntry, StoreError> {
        let mut stamp = self.stamper.stamp();
        // Entries loaded from an earlier run can already hold this tick's id.
        while self.entries.iter().any(|entry| entry.id == stamp.id) {
            stamp = self.stamper.stamp();
        }
        let entry = HistoryEntry {
            id: stamp.id,
            saved_at: stamp.saved_at,
            record: record.clone(),
        };
        self.entries.insert(0, entry);
        store.save_history(&self.entries)?;
        Ok(&self.entries[0])
    }

    /// Remove the entry with the given id. Idempotent: an absent id is a
    /// no-op, not an error. Returns whether anything was removed.
    pub fn remove<S: Storage>(
        &mut self,
        id: &str,
        store: &mut DraftStore<S>,
    ) -> Result<bool, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        store.save_history(&self.entries)?;
        Ok(true)
    }

    /// Current sequence, newest-first. Pure read.
    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
