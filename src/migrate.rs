//! Shape-sniffed migration from any previously observed persisted shape.
//!
//! Persisted data carries no schema-version tag, so the load path detects
//! the shape instead: a JSON array is the canonical ledger, a JSON object is
//! the legacy single-draft blob from the earliest app version. Back-fill is
//! a deliberate per-field merge over a default record rather than a generic
//! deep merge, so unknown keys can never leak into memory.

use crate::schema::{HistoryEntry, ReportRecord, MAX_IMAGES};
use serde_json::{Map, Value};

/// Human-readable notes produced while loading older persisted shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationNotes {
    notes: Vec<String>,
}

impl MigrationNotes {
    pub fn push(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.notes.iter().map(String::as_str)
    }
}

/// Route a parsed blob to the matching load path.
///
/// Returns the migrated legacy draft (if the blob was the old single-draft
/// object) and the history entries. Unrecognizable structure is an error
/// string for the store to wrap as corruption.
pub fn state_from_value(
    value: &Value,
    notes: &mut MigrationNotes,
) -> Result<(Option<ReportRecord>, Vec<HistoryEntry>), String> {
    match value {
        Value::Array(items) => {
            let mut entries = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let object = item
                    .as_object()
                    .ok_or_else(|| format!("history entry {idx} is not an object"))?;
                entries.push(entry_from_object(object, idx, notes)?);
            }
            Ok((None, entries))
        }
        Value::Object(object) => {
            notes.push("legacy single-draft blob migrated into the working draft");
            Ok((Some(record_from_object(object, notes)), Vec::new()))
        }
        _ => Err("persisted blob is neither a ledger array nor a draft object".to_string()),
    }
}

/// Back-fill a report record from a parsed JSON value, if it is an object.
pub fn record_from_value(value: &Value, notes: &mut MigrationNotes) -> Option<ReportRecord> {
    value.as_object().map(|object| record_from_object(object, notes))
}

fn entry_from_object(
    object: &Map<String, Value>,
    idx: usize,
    notes: &mut MigrationNotes,
) -> Result<HistoryEntry, String> {
    let id = str_field(object, "id");
    if id.is_empty() {
        return Err(format!("history entry {idx} has no id"));
    }
    let record = match object.get("data") {
        Some(Value::Object(data)) => record_from_object(data, notes),
        Some(_) => return Err(format!("history entry {idx} data is not an object")),
        None => {
            notes.push(format!("history entry {idx} had no data; using defaults"));
            ReportRecord::default()
        }
    };
    Ok(HistoryEntry {
        id,
        saved_at: str_field(object, "timestamp"),
        record,
    })
}

/// Default record first, then every known field present in the persisted
/// object overwrites the default. A present-but-empty string legitimately
/// overwrites; unknown keys are dropped.
fn record_from_object(object: &Map<String, Value>, notes: &mut MigrationNotes) -> ReportRecord {
    if object.contains_key("phonePK") {
        notes.push("dropped legacy contact field phonePK");
    }
    ReportRecord {
        unit_name: str_field(object, "unitName"),
        program: str_field(object, "program"),
        organiser: str_field(object, "anjuran"),
        date: str_field(object, "tarikh"),
        time: str_field(object, "masa"),
        attendee_count: str_field(object, "hadir"),
        absentee_count: str_field(object, "tidakHadir"),
        advisor_name: str_field(object, "guruPenasihat"),
        narrative: str_field(object, "laporan"),
        preparer_name: str_field(object, "namaPenyedia"),
        preparer_role: str_field(object, "jawatanPenyedia"),
        images: images_field(object, notes),
    }
}

fn str_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(text)) => text.clone(),
        // Counts were numbers in one observed variant.
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn images_field(object: &Map<String, Value>, notes: &mut MigrationNotes) -> Vec<String> {
    let Some(Value::Array(items)) = object.get("images") else {
        return Vec::new();
    };
    let mut images: Vec<String> = items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect();
    if images.len() > MAX_IMAGES {
        notes.push(format!(
            "truncated images from {} to {MAX_IMAGES}",
            images.len()
        ));
        images.truncate(MAX_IMAGES);
    }
    images
}
