use anyhow::{Context, Result};
use base64::Engine as _;
use std::path::Path;

/// Read an image file into a data URI for embedding in the report.
///
/// The MIME type is taken from the extension; unknown extensions fall back
/// to `application/octet-stream`, which browsers still render for the common
/// formats.
pub fn image_data_uri(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_carries_mime_and_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("foto.jpg");
        std::fs::write(&path, b"abc").expect("write image");
        let uri = image_data_uri(&path).expect("encode");
        assert_eq!(uri, "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn unknown_extension_gets_a_generic_mime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("foto.heic");
        std::fs::write(&path, b"x").expect("write image");
        let uri = image_data_uri(&path).expect("encode");
        assert!(uri.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(image_data_uri(Path::new("/nonexistent/foto.jpg")).is_err());
    }
}
