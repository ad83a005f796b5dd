//! Distribution hand-off: WhatsApp notification and the Drive folder link.
//!
//! Pure side effects from the core's point of view. The summary is derived
//! from the record; nothing here reads or writes stored state.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use regex::Regex;
use std::fmt::Write as _;
use std::process::Command;

use crate::schema::ReportRecord;

/// Shared folder the exported document is uploaded into.
pub const DRIVE_FOLDER_LINK: &str =
    "https://drive.google.com/drive/folders/1IQcstBUm_iv75qTZQpX3r99smSBU9kMj?usp=drive_link";

/// Default number for the co-curriculum senior assistant.
pub const DEFAULT_PK_PHONE: &str = "+60 13-257 6050";

fn or_dash(text: &str) -> &str {
    if text.is_empty() {
        "-"
    } else {
        text
    }
}

/// Normalize a Malaysian phone number to international digits for wa.me.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let non_digit = Regex::new(r"\D").expect("regex for non-digits");
    let digits = non_digit.replace_all(raw, "").into_owned();
    if digits.is_empty() {
        bail!("phone number '{raw}' has no digits");
    }
    let normalized = if let Some(rest) = digits.strip_prefix('0') {
        format!("60{rest}")
    } else if digits.starts_with('1') {
        format!("60{digits}")
    } else {
        digits
    };
    Ok(normalized)
}

/// WhatsApp summary for the senior assistant, mirroring the official
/// notification format.
pub fn share_message(record: &ReportRecord) -> String {
    let attendance = if record.attendee_count.is_empty() {
        "0"
    } else {
        &record.attendee_count
    };
    let year = record
        .date
        .split_once('-')
        .map(|(year, _)| year.to_string())
        .filter(|year| year.len() == 4)
        .unwrap_or_else(|| Utc::now().year().to_string());

    let mut message = String::new();
    let _ = writeln!(message, "*LAPORAN MINGGUAN KOKURIKULUM SK KRANGAN {year}*");
    message.push('\n');
    let _ = writeln!(message, "*Program:* {}", or_dash(&record.program));
    let _ = writeln!(message, "*Tarikh:* {}", or_dash(&record.date));
    let _ = writeln!(message, "*Kehadiran:* {attendance} Orang");
    message.push('\n');
    let _ = writeln!(
        message,
        "*Disediakan oleh:* {}",
        or_dash(&record.preparer_name)
    );
    message.push('\n');
    message.push_str(
        "_Sila lampirkan fail laporan yang telah dijana. Laporan juga akan dimuat naik ke folder Google Drive Kokurikulum._",
    );
    message
}

/// Build the wa.me share URL for a normalized phone number.
pub fn whatsapp_url(phone_digits: &str, message: &str) -> String {
    format!("https://wa.me/{phone_digits}?text={}", percent_encode(message))
}

/// Percent-encode in the manner of `encodeURIComponent`.
fn percent_encode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len() * 3);
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            other => {
                let _ = write!(encoded, "%{other:02X}");
            }
        }
    }
    encoded
}

/// Open a URL in the platform's default handler. Fire-and-forget: nothing is
/// consumed from the target.
pub fn open_external(url: &str) -> Result<()> {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    };
    Command::new(program)
        .args(args)
        .arg(url)
        .spawn()
        .with_context(|| format!("open {url}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_numbers_normalize_to_international_digits() {
        assert_eq!(normalize_phone("013-257 6050").expect("local"), "60132576050");
        assert_eq!(normalize_phone("13 257 6050").expect("bare"), "60132576050");
        assert_eq!(
            normalize_phone("+60 13-257 6050").expect("international"),
            "60132576050"
        );
        assert!(normalize_phone("no digits here").is_err());
    }

    #[test]
    fn message_summarizes_the_record() {
        let record = ReportRecord {
            program: "Perjumpaan Pengakap".to_string(),
            date: "2026-01-14".to_string(),
            attendee_count: "32".to_string(),
            preparer_name: "Cikgu Aminah".to_string(),
            ..ReportRecord::default()
        };
        let message = share_message(&record);
        assert!(message.contains("SK KRANGAN 2026"));
        assert!(message.contains("*Program:* Perjumpaan Pengakap"));
        assert!(message.contains("*Kehadiran:* 32 Orang"));
        assert!(message.contains("*Disediakan oleh:* Cikgu Aminah"));
    }

    #[test]
    fn blank_fields_fall_back_in_the_message() {
        let message = share_message(&ReportRecord::default());
        assert!(message.contains("*Program:* -"));
        assert!(message.contains("*Kehadiran:* 0 Orang"));
        assert!(message.contains("*Disediakan oleh:* -"));
    }

    #[test]
    fn share_url_is_percent_encoded() {
        let url = whatsapp_url("60132576050", "*Program:* Sukan & Permainan\n");
        assert!(url.starts_with("https://wa.me/60132576050?text="));
        // WhatsApp bold markers stay literal, matching encodeURIComponent.
        assert!(url.contains("*Program%3A*%20Sukan%20%26%20Permainan%0A"));
        assert!(!url.contains(' '));
        assert!(!url.contains('&'));
    }
}
