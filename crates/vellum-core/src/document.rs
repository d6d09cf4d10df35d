//! Document typing, extension detection, and file-name sanitization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every extension the pipeline accepts. Each maps to exactly one
/// [`DocumentType`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "csv", "doc", "docm", "docx", "dot", "dotx", "odp", "ods", "odt", "otp", "ots", "ott", "potx",
    "ppt", "pptm", "pptx", "rtf", "txt", "xls", "xlsm", "xlsx", "xltx",
];

/// Extension routed through the CSV fallback before the engine sees it.
pub const CSV_EXTENSION: &str = "csv";

/// Longest sanitized file-name stem, in characters.
const MAX_STEM_LEN: usize = 100;

/// Document family understood by the engine and the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Word-processing documents.
    Word,
    /// Spreadsheets, including transcoded CSV.
    Cell,
    /// Presentations.
    Slide,
}

impl DocumentType {
    /// Map a lowercase extension to its document type.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "doc" | "docm" | "docx" | "dot" | "dotx" | "odt" | "ott" | "rtf" | "txt" => {
                Some(Self::Word)
            }
            "csv" | "ods" | "ots" | "xls" | "xlsm" | "xlsx" | "xltx" => Some(Self::Cell),
            "odp" | "otp" | "potx" | "ppt" | "pptm" | "pptx" => Some(Self::Slide),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Cell => "cell",
            Self::Slide => "slide",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an extension to a [`DocumentType`], rejecting unknown extensions.
pub fn detect_type(extension: &str) -> Result<DocumentType> {
    DocumentType::from_extension(extension)
        .ok_or_else(|| Error::UnsupportedFormat(extension.to_string()))
}

/// One document to convert. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Name the caller knows the document by; preserved (sanitized) in
    /// the conversion result.
    pub file_name: String,

    /// Detected extension, lowercase. Declared media type wins over the
    /// trailing name segment.
    pub extension: String,

    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

impl ConversionRequest {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let extension = detect_extension(&file_name, content_type);
        Self {
            file_name,
            extension,
            bytes,
        }
    }
}

/// Detect the effective extension: declared media type first, then the
/// trailing segment of the file name. Lowercase; empty when neither
/// source yields one.
pub fn detect_extension(file_name: &str, content_type: Option<&str>) -> String {
    if let Some(extension) = content_type.and_then(extension_for_content_type) {
        return extension.to_string();
    }
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default()
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    // Parameters like "; charset=utf-8" do not affect the mapping.
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.oasis.opendocument.text" => Some("odt"),
        "application/rtf" | "text/rtf" => Some("rtf"),
        "text/plain" => Some("txt"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx"),
        "application/vnd.oasis.opendocument.spreadsheet" => Some("ods"),
        "text/csv" => Some("csv"),
        "application/vnd.ms-powerpoint" => Some("ppt"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some("pptx")
        }
        "application/vnd.oasis.opendocument.presentation" => Some("odp"),
        _ => None,
    }
}

/// Sanitize a file name for use inside the working directory.
///
/// Strips path separators, shell punctuation, and control characters
/// from the stem, trims it, bounds its length, falls back to a generic
/// name when nothing survives, and re-appends the extension. Idempotent.
pub fn sanitize_file_name(name: &str) -> String {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) => (stem, extension),
        None => (name, ""),
    };

    let mut clean: String = stem
        .chars()
        .filter(|c| is_allowed_name_char(*c))
        .take(MAX_STEM_LEN)
        .collect();
    clean = clean
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string();
    if clean.is_empty() {
        clean = "document".to_string();
    }

    let clean_extension: String = extension
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if clean_extension.is_empty() {
        clean
    } else {
        format!("{clean}.{clean_extension}")
    }
}

fn is_allowed_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-' | '(' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_supported_extension_has_a_type() {
        for extension in SUPPORTED_EXTENSIONS {
            assert!(
                DocumentType::from_extension(extension).is_some(),
                "no type for {extension}"
            );
        }
    }

    #[test]
    fn test_detect_type_rejects_unknown_extensions() {
        for extension in ["exe", "pdf", "tar", ""] {
            assert!(matches!(
                detect_type(extension),
                Err(Error::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_detect_type_is_stable() {
        assert_eq!(detect_type("docx").unwrap(), DocumentType::Word);
        assert_eq!(detect_type("csv").unwrap(), DocumentType::Cell);
        assert_eq!(detect_type("pptx").unwrap(), DocumentType::Slide);
        assert_eq!(detect_type("docx").unwrap(), detect_type("docx").unwrap());
    }

    #[test]
    fn test_content_type_wins_over_name() {
        assert_eq!(
            detect_extension("upload.tmp", Some("text/csv")),
            "csv".to_string()
        );
        assert_eq!(
            detect_extension("upload.tmp", Some("text/csv; charset=utf-8")),
            "csv".to_string()
        );
    }

    #[test]
    fn test_name_segment_is_the_fallback() {
        assert_eq!(detect_extension("Report.DOCX", None), "docx".to_string());
        assert_eq!(
            detect_extension("Report.DOCX", Some("application/octet-stream")),
            "docx".to_string()
        );
        assert_eq!(detect_extension("no-extension", None), "".to_string());
    }

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_file_name("Report.docx"), "Report.docx");
        assert_eq!(sanitize_file_name("Q3 results (final).xlsx"), "Q3 results (final).xlsx");
    }

    #[test]
    fn test_sanitize_strips_path_and_shell_characters() {
        assert_eq!(sanitize_file_name("a/b\\c.docx"), "abc.docx");
        assert_eq!(sanitize_file_name("rm -rf $HOME;`x`.pptx"), "rm -rf HOMEx.pptx");
        assert_eq!(sanitize_file_name("line\u{0}\u{7}feed\n.txt"), "linefeed.txt");
    }

    #[test]
    fn test_sanitize_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_file_name("///.docx"), "document.docx");
        assert_eq!(sanitize_file_name(""), "document");
    }

    #[test]
    fn test_sanitize_bounds_the_stem() {
        let long = format!("{}.docx", "x".repeat(500));
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized, format!("{}.docx", "x".repeat(100)));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let names = [
            "Report.docx",
            "../../etc/passwd",
            "a/b\\c.docx",
            "///.docx",
            "",
            " spaced out .csv",
            &format!("{}.docx", "x".repeat(500)),
            "résumé.odt",
        ];
        for name in names {
            let once = sanitize_file_name(name);
            assert_eq!(sanitize_file_name(&once), once, "not idempotent for {name:?}");
        }
    }
}
