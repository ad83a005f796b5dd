//! Fixed-layout printable document rendering.
//!
//! The output is a single self-contained A4 HTML page mirroring the official
//! report template: school header, detail table, narrative block, photo grid
//! (three over three), signature block. Rendering is a pure function of the
//! record so the same snapshot always produces the same document.

use crate::schema::{ReportRecord, MAX_IMAGES};
use std::fmt::Write as _;

const SCHOOL_NAME: &str = "SEKOLAH KEBANGSAAN KRANGAN";
const SCHOOL_ADDRESS: &str = "94700 SERIAN, SARAWAK";

const PAGE_CSS: &str = "\
@page { size: A4 portrait; margin: 0; }\n\
body { margin: 0; background: #ffffff; color: #000000; font-family: 'Inter', 'Arial', sans-serif; }\n\
.page { width: 210mm; min-height: 297mm; padding: 12mm 20mm; box-sizing: border-box; margin: 0 auto; }\n\
.header { text-align: center; margin-bottom: 8px; }\n\
.header h1 { font-size: 12pt; font-weight: bold; margin: 0; text-transform: uppercase; letter-spacing: 0.5px; }\n\
.header p { font-size: 8.5pt; margin: 1px 0; font-weight: 600; }\n\
.rule { border-bottom: 1.5pt double #000000; margin-top: 6px; }\n\
.title { text-align: center; margin-bottom: 8px; }\n\
.title h2 { font-size: 9pt; font-weight: bold; text-decoration: underline; text-transform: uppercase; }\n\
table.details { width: 100%; border-collapse: collapse; margin-bottom: 8px; table-layout: fixed; }\n\
table.details td { border: 1pt solid #000000; padding: 5px 8px; font-size: 9.5pt; vertical-align: middle; word-break: break-word; }\n\
table.details td.label { background: #f8fafc; font-weight: bold; font-size: 8.5pt; text-transform: uppercase; width: 25%; }\n\
.narrative-head { background: #f1f5f9; padding: 3px 8px; border: 1pt solid #000000; border-bottom: none; font-size: 8pt; font-weight: bold; text-transform: uppercase; }\n\
.narrative { border: 1pt solid #000000; padding: 8px 10px; font-size: 9.5pt; line-height: 1.4; text-align: justify; min-height: 30mm; white-space: pre-wrap; }\n\
.photos-head { font-size: 7.5pt; font-weight: bold; margin: 8px 0 4px; text-transform: uppercase; border-bottom: 0.8pt solid #000000; display: inline-block; }\n\
.photos { display: grid; grid-template-columns: repeat(3, 1fr); gap: 6px; margin-bottom: 8px; }\n\
.photo { border: 0.5pt solid #000000; padding: 2px; }\n\
.photo img { width: 100%; height: 24mm; object-fit: cover; display: block; background: #f8fafc; }\n\
.photo .caption { font-size: 6.5pt; text-align: center; margin-top: 1px; font-weight: bold; }\n\
.signatures { border-top: 1pt solid #000000; padding-top: 6px; margin-top: 12px; }\n\
.signatures table { width: 100%; border-collapse: collapse; }\n\
.signatures td { width: 50%; vertical-align: top; font-size: 9pt; }\n\
.signatures .line { border-bottom: 0.8pt solid #000000; width: 85%; margin: 20px 0 2px; }\n\
.signatures .name { font-weight: bold; text-transform: uppercase; margin: 0; }\n\
.signatures .role { font-size: 8pt; margin: 0; }\n\
@media print { .page { height: 297mm; overflow: hidden; } }\n";

/// Render a record into a complete printable HTML document.
pub fn render_document(record: &ReportRecord) -> String {
    let mut doc = String::with_capacity(8 * 1024);
    doc.push_str("<!DOCTYPE html>\n<html lang=\"ms\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(doc, "<title>{}</title>", escape_html(report_title(record)));
    let _ = writeln!(doc, "<style>\n{PAGE_CSS}</style>");
    doc.push_str("</head>\n<body>\n<div class=\"page\">\n");

    render_header(&mut doc, record);
    render_details(&mut doc, record);
    render_narrative(&mut doc, record);
    render_photos(&mut doc, record);
    render_signatures(&mut doc, record);

    doc.push_str("</div>\n</body>\n</html>\n");
    doc
}

fn report_title(record: &ReportRecord) -> String {
    match report_year(record) {
        Some(year) => format!("LAPORAN PERJUMPAAN MINGGUAN KOKURIKULUM TAHUN {year}"),
        None => "LAPORAN PERJUMPAAN MINGGUAN KOKURIKULUM".to_string(),
    }
}

/// Year taken from the record's own date so the document stays reproducible.
fn report_year(record: &ReportRecord) -> Option<&str> {
    let (year, _) = record.date.split_once('-')?;
    if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
        Some(year)
    } else {
        None
    }
}

fn render_header(doc: &mut String, record: &ReportRecord) {
    doc.push_str("<div class=\"header\">\n");
    let _ = writeln!(doc, "<h1>{}</h1>", escape_html(SCHOOL_NAME.to_string()));
    let _ = writeln!(doc, "<p>{}</p>", escape_html(SCHOOL_ADDRESS.to_string()));
    doc.push_str("<div class=\"rule\"></div>\n</div>\n");
    doc.push_str("<div class=\"title\">\n");
    let _ = writeln!(doc, "<h2>{}</h2>", escape_html(report_title(record)));
    doc.push_str("</div>\n");
}

fn render_details(doc: &mut String, record: &ReportRecord) {
    let dash = |text: &str| {
        if text.is_empty() {
            "-".to_string()
        } else {
            escape_html(text.to_string())
        }
    };
    let zero = |text: &str| {
        if text.is_empty() {
            "0".to_string()
        } else {
            escape_html(text.to_string())
        }
    };

    doc.push_str("<table class=\"details\">\n<tbody>\n");
    let _ = writeln!(
        doc,
        "<tr><td class=\"label\">KELAB / UNIT</td><td colspan=\"3\"><b>{}</b></td></tr>",
        dash(&record.unit_name)
    );
    let _ = writeln!(
        doc,
        "<tr><td class=\"label\">PROGRAM / AKTIVITI</td><td>{}</td><td class=\"label\">TARIKH</td><td>{}</td></tr>",
        dash(&record.program),
        dash(&record.date)
    );
    let _ = writeln!(
        doc,
        "<tr><td class=\"label\">ANJURAN</td><td>{}</td><td class=\"label\">MASA</td><td>{}</td></tr>",
        dash(&record.organiser),
        dash(&record.time)
    );
    let _ = writeln!(
        doc,
        "<tr><td class=\"label\">KEHADIRAN</td><td>HADIR: {} | T/HADIR: {}</td><td class=\"label\">PENASIHAT</td><td>{}</td></tr>",
        zero(&record.attendee_count),
        zero(&record.absentee_count),
        dash(&record.advisor_name)
    );
    doc.push_str("</tbody>\n</table>\n");
}

fn render_narrative(doc: &mut String, record: &ReportRecord) {
    doc.push_str("<div class=\"narrative-head\">RINGKASAN AKTIVITI / LAPORAN :</div>\n");
    let body = if record.narrative.is_empty() {
        "Tiada laporan aktiviti direkodkan.".to_string()
    } else {
        escape_html(record.narrative.clone())
    };
    let _ = writeln!(doc, "<div class=\"narrative\">{body}</div>");
}

fn render_photos(doc: &mut String, record: &ReportRecord) {
    // Ingestion already truncates, but a hand-edited blob must not overflow
    // the page.
    let images = &record.images[..record.images.len().min(MAX_IMAGES)];
    if images.is_empty() {
        return;
    }
    doc.push_str("<div class=\"photos-head\">LAMPIRAN FOTO AKTIVITI :</div>\n");
    doc.push_str("<div class=\"photos\">\n");
    for (idx, image) in images.iter().enumerate() {
        let _ = writeln!(
            doc,
            "<div class=\"photo\"><img src=\"{}\" alt=\"Foto {}\"><div class=\"caption\">FOTO {}</div></div>",
            escape_html(image.clone()),
            idx + 1,
            idx + 1
        );
    }
    doc.push_str("</div>\n");
}

fn render_signatures(doc: &mut String, record: &ReportRecord) {
    let preparer = if record.preparer_name.is_empty() {
        "............................................".to_string()
    } else {
        escape_html(record.preparer_name.clone())
    };
    let role = if record.preparer_role.is_empty() {
        "GURU PENASIHAT".to_string()
    } else {
        escape_html(record.preparer_role.clone())
    };

    doc.push_str("<div class=\"signatures\">\n<table>\n<tbody>\n<tr>\n");
    let _ = writeln!(
        doc,
        "<td><p><b>Disediakan Oleh,</b></p><div class=\"line\"></div><p class=\"name\">({preparer})</p><p class=\"role\">{role}</p><p class=\"role\">SK KRANGAN, SERIAN</p></td>"
    );
    doc.push_str(
        "<td><p><b>Disahkan Oleh,</b></p><div class=\"line\"></div><p class=\"name\">(GPK KOKURIKULUM)</p><p class=\"role\">SK KRANGAN, SERIAN</p><p class=\"role\">Tarikh: ............................................</p></td>\n",
    );
    doc.push_str("</tr>\n</tbody>\n</table>\n</div>\n");
}

fn escape_html(raw: String) -> String {
    if !raw.contains(['&', '<', '>', '"', '\'']) {
        return raw;
    }
    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
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
    fn rendering_is_deterministic() {
        let record = sample_record();
        assert_eq!(render_document(&record), render_document(&record));
    }

    #[test]
    fn document_carries_every_field() {
        let doc = render_document(&sample_record());
        for expected in [
            "Perjumpaan Pengakap Bil. 1",
            "Unit Beruniform",
            "2026-01-14",
            "2:00 PM - 4:00 PM",
            "HADIR: 32 | T/HADIR: 3",
            "Cikgu Roslan",
            "Latihan ikatan dan simpulan.",
            "Cikgu Aminah",
            "Guru Penasihat",
            "data:image/jpeg;base64,AAAA",
            "TAHUN 2026",
        ] {
            assert!(doc.contains(expected), "missing {expected:?}");
        }
    }

    #[test]
    fn empty_record_renders_placeholders() {
        let doc = render_document(&ReportRecord::default());
        assert!(doc.contains("Tiada laporan aktiviti direkodkan."));
        assert!(doc.contains("HADIR: 0 | T/HADIR: 0"));
        assert!(!doc.contains("LAMPIRAN FOTO"));
        assert!(!doc.contains("TAHUN"));
    }

    #[test]
    fn field_text_is_html_escaped() {
        let record = ReportRecord {
            program: "<script>alert('x')</script>".to_string(),
            ..ReportRecord::default()
        };
        let doc = render_document(&record);
        assert!(!doc.contains("<script>"));
        assert!(doc.contains("&lt;script&gt;"));
    }

    #[test]
    fn photo_grid_never_exceeds_six() {
        let record = ReportRecord {
            images: (0..9).map(|idx| format!("data:{idx}")).collect(),
            ..ReportRecord::default()
        };
        let doc = render_document(&record);
        assert!(doc.contains("FOTO 6"));
        assert!(!doc.contains("FOTO 7"));
    }
}
