//! Export of rendered reports to deterministically named files.
//!
//! The write is staged through a temp file and renamed into place so a
//! failure never leaves a partial document behind.

use crate::render;
use crate::schema::ReportRecord;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Fallback file-name stem when neither unit nor program is filled in.
const FALLBACK_NAME: &str = "Mingguan";

/// Fields that must be filled before a report may leave the system.
///
/// These are warnings, not errors: they block the export operation only and
/// never touch stored drafts.
pub fn validate_for_export(record: &ReportRecord) -> Vec<String> {
    let mut warnings = Vec::new();
    if record.program.is_empty() {
        warnings.push("program / aktiviti is empty".to_string());
    }
    if record.preparer_name.is_empty() {
        warnings.push("nama penyedia is empty".to_string());
    }
    warnings
}

/// Deterministic export file name: sanitized unit-or-program stem plus the
/// record's own date.
pub fn export_file_name(record: &ReportRecord) -> String {
    let stem = [record.unit_name.as_str(), record.program.as_str()]
        .into_iter()
        .map(sanitize_component)
        .find(|component| !component.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    let date = sanitize_component(&record.date);
    if date.is_empty() {
        format!("Laporan_Koku_{stem}.html")
    } else {
        format!("Laporan_Koku_{stem}_{date}.html")
    }
}

/// Anything path-hostile is stripped, then whitespace runs become single
/// underscores. Stripping first keeps a hostile character flanked by spaces
/// from leaving a doubled underscore.
fn sanitize_component(raw: &str) -> String {
    let hostile = Regex::new(r"[^A-Za-z0-9._\s-]").expect("regex for hostile characters");
    let whitespace = Regex::new(r"\s+").expect("regex for whitespace runs");
    let stripped = hostile.replace_all(raw.trim(), "");
    whitespace
        .replace_all(stripped.trim(), "_")
        .trim_matches('_')
        .to_string()
}

/// Render the record and write it under `out_dir`, returning the final path.
pub fn export_report(record: &ReportRecord, out_dir: &Path) -> Result<PathBuf> {
    let warnings = validate_for_export(record);
    if !warnings.is_empty() {
        bail!("report is not ready to export: {}", warnings.join("; "));
    }

    let document = render::render_document(record);
    let path = out_dir.join(export_file_name(record));
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create {}", out_dir.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(out_dir).context("stage export file")?;
    staged
        .write_all(document.as_bytes())
        .context("write staged document")?;
    staged
        .persist(&path)
        .with_context(|| format!("publish {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = document.len(), "report exported");
    Ok(path)
}
