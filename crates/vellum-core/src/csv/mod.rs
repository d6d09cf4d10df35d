//! CSV fallback for engines without native CSV import.
//!
//! The engine only opens real spreadsheet formats, so CSV input is
//! decoded, parsed, and repackaged as a minimal workbook before it is
//! handed over. Every failure in this stage maps to
//! [`Error::CsvTranscode`] so callers can tell users to convert the
//! file themselves.

mod parser;
mod workbook;

use tracing::debug;

use crate::error::{Error, Result};

/// Extension given to transcoded workbooks.
pub const SPREADSHEET_EXTENSION: &str = "xlsx";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A CSV payload repackaged as a spreadsheet.
#[derive(Debug)]
pub struct TranscodedCsv {
    /// Original name with the extension swapped for [`SPREADSHEET_EXTENSION`].
    pub file_name: String,
    /// Workbook archive bytes.
    pub bytes: Vec<u8>,
}

/// Convert CSV bytes into a single-sheet workbook.
pub fn transcode(file_name: &str, bytes: &[u8]) -> Result<TranscodedCsv> {
    reject_empty(bytes)?;
    let text = decode_text(strip_bom(bytes));
    let rows = parser::parse_rows(&text).map_err(Error::CsvTranscode)?;
    let bytes = workbook::build_workbook(&rows).map_err(Error::CsvTranscode)?;
    let file_name = rename_to_spreadsheet(file_name);
    debug!(%file_name, rows = rows.len(), "transcoded csv to workbook");
    Ok(TranscodedCsv { file_name, bytes })
}

/// Empty CSV input can never become a workbook; fail before any engine
/// work starts.
pub(crate) fn reject_empty(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(Error::CsvTranscode("file is empty".to_string()));
    }
    Ok(())
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Decode as UTF-8, falling back to Windows-1252 for legacy exports.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

fn rename_to_spreadsheet(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.{SPREADSHEET_EXTENSION}"),
        None => format!("{file_name}.{SPREADSHEET_EXTENSION}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    fn worksheet_text(archive: &[u8]) -> String {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
        let mut part = zip.by_name("xl/worksheets/sheet1.xml").unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_transcode_renames_and_packages() {
        let result = transcode("data.csv", b"a,b\n1,2\n").unwrap();
        assert_eq!(result.file_name, "data.xlsx");
        assert!(result.bytes.starts_with(b"PK\x03\x04"));
        let sheet = worksheet_text(&result.bytes);
        assert!(sheet.contains(">a</t>"));
        assert!(sheet.contains(">2</t>"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"name\nvalue\n");
        let result = transcode("list.csv", &bytes).unwrap();
        let sheet = worksheet_text(&result.bytes);
        assert!(sheet.contains(">name</t>"));
        assert!(!sheet.contains('\u{feff}'));
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "café" with an 0xE9 byte, invalid as UTF-8.
        let bytes = [b'c', b'a', b'f', 0xE9, b'\n'];
        let result = transcode("menu.csv", &bytes).unwrap();
        let sheet = worksheet_text(&result.bytes);
        assert!(sheet.contains(">café</t>"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        match transcode("empty.csv", b"") {
            Err(Error::CsvTranscode(message)) => assert_eq!(message, "file is empty"),
            other => panic!("expected csv transcode error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_failure_maps_to_transcode_error() {
        let result = transcode("broken.csv", b"\"never closed");
        assert!(matches!(result, Err(Error::CsvTranscode(_))));
    }

    #[test]
    fn test_rename_handles_missing_extension() {
        assert_eq!(rename_to_spreadsheet("data.csv"), "data.xlsx");
        assert_eq!(rename_to_spreadsheet("data"), "data.xlsx");
        assert_eq!(rename_to_spreadsheet("a.b.csv"), "a.b.xlsx");
    }
}
