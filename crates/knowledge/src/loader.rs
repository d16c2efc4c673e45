//! Document loading and filename handling.
//!
//! Supported formats: TXT, MD, CSV. PDF is recognized but rejected with an
//! explicit error since no extraction backend is available.

use quarry_core::{AppError, AppResult};
use std::path::Path;

/// Extensions the loader can read natively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "csv"];

/// Extensions the system recognizes as documents (superset of supported).
pub const KNOWN_EXTENSIONS: &[&str] = &["txt", "md", "csv", "pdf"];

/// Get the lowercase extension of a file name, without the dot.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Check whether the file is a recognized document format.
pub fn is_known_document(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check whether the file can be loaded natively.
pub fn is_supported_document(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Sanitize a file name for use as a document title.
///
/// Strips any path components, then removes characters outside
/// alphanumerics, dots, underscores, dashes, and spaces.
pub fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .collect()
}

/// Map an extension to a content type label.
pub fn content_type(extension: &str) -> &'static str {
    match extension {
        "md" => "markdown",
        "csv" => "csv",
        _ => "text",
    }
}

/// Load the text content of a document.
///
/// # Errors
/// Returns `AppError::Knowledge` for unsupported formats (including PDF)
/// and for unreadable files.
pub fn load_text(path: &Path) -> AppResult<String> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let extension = file_extension(&filename).ok_or_else(|| {
        AppError::Knowledge(format!("File has no extension: {}", path.display()))
    })?;

    if extension == "pdf" {
        return Err(AppError::Knowledge(format!(
            "PDF extraction is not supported: {}. Convert the document to TXT, MD, or CSV first.",
            path.display()
        )));
    }

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Knowledge(format!(
            "Unsupported file type '.{}': {}. Supported: TXT, MD, CSV",
            extension,
            path.display()
        )));
    }

    if !path.exists() {
        return Err(AppError::Knowledge(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {}: {}", path.display(), e)))?;

    tracing::info!("Loaded document {} ({} bytes)", filename, text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("notes.md"), Some("md".to_string()));
        assert_eq!(file_extension("noext"), None);
    }

    #[test]
    fn test_known_and_supported() {
        assert!(is_known_document("a.pdf"));
        assert!(!is_supported_document("a.pdf"));
        assert!(is_supported_document("a.txt"));
        assert!(is_supported_document("a.csv"));
        assert!(!is_known_document("a.exe"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my report (v2).txt"), "my report v2.txt");
        assert_eq!(sanitize_filename("notes_2024-01.md"), "notes_2024-01.md");
    }

    #[test]
    fn test_load_text_rejects_pdf() {
        let err = load_text(Path::new("/tmp/whatever.pdf")).unwrap_err();
        assert!(err.to_string().contains("PDF extraction is not supported"));
    }

    #[test]
    fn test_load_text_rejects_unknown_extension() {
        let err = load_text(Path::new("/tmp/whatever.exe")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_load_text_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "hello quarry").unwrap();

        let text = load_text(&path).unwrap();
        assert!(text.contains("hello quarry"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("md"), "markdown");
        assert_eq!(content_type("csv"), "csv");
        assert_eq!(content_type("txt"), "text");
    }
}
