//! Minimal spreadsheet packaging for transcoded tabular data.
//!
//! Produces the smallest workbook the engine accepts: one sheet, every
//! cell an inline string, no styles or shared-string table.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::xml::escape_xml;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const ROOT_RELS_PART: &str = "_rels/.rels";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const WORKSHEET_PART: &str = "xl/worksheets/sheet1.xml";

const CONTENT_TYPES_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
    "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
    "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    "<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
    "<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
    "</Types>",
);

const ROOT_RELS_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>",
    "</Relationships>",
);

const WORKBOOK_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
    "<sheets><sheet name=\"Sheet1\" sheetId=\"1\" r:id=\"rId1\"/></sheets>",
    "</workbook>",
);

const WORKBOOK_RELS_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>",
    "</Relationships>",
);

/// Package rows into an in-memory spreadsheet archive.
pub(crate) fn build_workbook(rows: &[Vec<String>]) -> Result<Vec<u8>, String> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, String); 5] = [
        (CONTENT_TYPES_PART, CONTENT_TYPES_XML.to_string()),
        (ROOT_RELS_PART, ROOT_RELS_XML.to_string()),
        (WORKBOOK_PART, WORKBOOK_XML.to_string()),
        (WORKBOOK_RELS_PART, WORKBOOK_RELS_XML.to_string()),
        (WORKSHEET_PART, worksheet_xml(rows)),
    ];
    for (name, content) in parts {
        writer
            .start_file(name, options)
            .map_err(|e| format!("failed to add {name}: {e}"))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| format!("failed to write {name}: {e}"))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| format!("failed to finish spreadsheet archive: {e}"))?;
    Ok(cursor.into_inner())
}

fn worksheet_xml(rows: &[Vec<String>]) -> String {
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
        "<sheetData>",
    ));
    for (row_index, row) in rows.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!("<row r=\"{row_number}\">"));
        for (column_index, value) in row.iter().enumerate() {
            xml.push_str(&format!(
                "<c r=\"{}{row_number}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                column_name(column_index),
                escape_xml(value),
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Spreadsheet column labels: 0 -> A, 25 -> Z, 26 -> AA.
fn column_name(mut index: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name
}
