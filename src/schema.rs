//! Schema types for report records and history entries.
//!
//! Wire names match the JSON the original report app persisted, so saved
//! data from any earlier version stays readable.

use serde::{Deserialize, Serialize};

/// A report page lays photos out three over three; anything past six is
/// dropped on ingestion.
pub const MAX_IMAGES: usize = 6;

/// One weekly activity report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRecord {
    #[serde(rename = "unitName")]
    pub unit_name: String,
    pub program: String,
    #[serde(rename = "anjuran")]
    pub organiser: String,
    #[serde(rename = "tarikh")]
    pub date: String,
    #[serde(rename = "masa")]
    pub time: String,
    #[serde(rename = "hadir")]
    pub attendee_count: String,
    #[serde(rename = "tidakHadir")]
    pub absentee_count: String,
    #[serde(rename = "guruPenasihat")]
    pub advisor_name: String,
    #[serde(rename = "laporan")]
    pub narrative: String,
    #[serde(rename = "namaPenyedia")]
    pub preparer_name: String,
    #[serde(rename = "jawatanPenyedia")]
    pub preparer_role: String,
    pub images: Vec<String>,
}

impl ReportRecord {
    /// Append an image data URI, enforcing the six-photo cap.
    ///
    /// Returns false when the record is already full and the image was
    /// dropped.
    pub fn push_image(&mut self, data_uri: String) -> bool {
        if self.images.len() >= MAX_IMAGES {
            return false;
        }
        self.images.push(data_uri);
        true
    }

    /// Title shown in listings; untitled drafts get a placeholder.
    pub fn display_title(&self) -> &str {
        if self.program.is_empty() {
            "Tanpa Tajuk"
        } else {
            &self.program
        }
    }
}

/// One saved snapshot in the history ledger.
///
/// `record` is a full value copy; editing the live draft after a save never
/// reaches back into a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "timestamp")]
    pub saved_at: String,
    #[serde(rename = "data")]
    pub record: ReportRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_image_enforces_cap() {
        let mut record = ReportRecord::default();
        for idx in 0..MAX_IMAGES {
            assert!(record.push_image(format!("data:image/png;base64,{idx}")));
        }
        assert!(!record.push_image("data:image/png;base64,extra".to_string()));
        assert_eq!(record.images.len(), MAX_IMAGES);
        assert_eq!(record.images[0], "data:image/png;base64,0");
    }

    #[test]
    fn display_title_falls_back_for_untitled_drafts() {
        let mut record = ReportRecord::default();
        assert_eq!(record.display_title(), "Tanpa Tajuk");
        record.program = "Perjumpaan Pengakap".to_string();
        assert_eq!(record.display_title(), "Perjumpaan Pengakap");
    }

    #[test]
    fn record_serializes_with_wire_names() {
        let record = ReportRecord {
            program: "Perjumpaan Pengakap".to_string(),
            absentee_count: "3".to_string(),
            ..ReportRecord::default()
        };
        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(value["program"], "Perjumpaan Pengakap");
        assert_eq!(value["tidakHadir"], "3");
        assert!(value.get("absentee_count").is_none());
    }
}
