//! XLSX Export Module
//! Writes a single-sheet workbook by generating the SpreadsheetML parts
//! directly into a ZIP container.

use super::ExportError;
use polars::prelude::*;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use tracing::info;
use ::zip::write::FileOptions;
use ::zip::ZipWriter;

/// Excel rejects sheet names longer than this.
const MAX_SHEET_NAME: usize = 31;

/// Workbook generator for tabular exports
pub struct XlsxWriter;

enum Cell {
    Number(f64),
    Text(String),
}

impl XlsxWriter {
    /// Write `df` to `path` as a one-sheet workbook.
    pub fn write_file(df: &DataFrame, path: &Path, sheet: &str) -> Result<(), ExportError> {
        let file = File::create(path)?;
        Self::write_to(df, file, sheet)?;
        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "XLSX generated"
        );
        Ok(())
    }

    pub fn write_to<W: Write + Seek>(
        df: &DataFrame,
        writer: W,
        sheet: &str,
    ) -> Result<(), ExportError> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml().as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml(&sheet_name(sheet)).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(Self::workbook_rels_xml().as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(Self::sheet_xml(df)?.as_bytes())?;

        zip.finish()?;
        Ok(())
    }

    fn content_types_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
    }

    fn workbook_xml(sheet: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            escape(sheet)
        )
    }

    fn workbook_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
    }

    fn sheet_xml(df: &DataFrame) -> PolarsResult<String> {
        let columns = df
            .get_columns()
            .iter()
            .map(cells)
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut rows = String::new();

        // Header row
        rows.push_str(r#"<row r="1">"#);
        for (col_idx, name) in df.get_column_names().iter().enumerate() {
            rows.push_str(&text_cell(col_idx, 1, name.as_str()));
        }
        rows.push_str("</row>\n");

        for row_idx in 0..df.height() {
            let row_num = row_idx + 2;
            rows.push_str(&format!(r#"<row r="{}">"#, row_num));
            for (col_idx, column) in columns.iter().enumerate() {
                match column.get(row_idx).and_then(Option::as_ref) {
                    Some(Cell::Number(value)) => rows.push_str(&format!(
                        r#"<c r="{}{}"><v>{}</v></c>"#,
                        column_letter(col_idx),
                        row_num,
                        value
                    )),
                    Some(Cell::Text(value)) => rows.push_str(&text_cell(col_idx, row_num, value)),
                    None => {}
                }
            }
            rows.push_str("</row>\n");
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
{}</sheetData>
</worksheet>"#,
            rows
        ))
    }
}

/// Convenience wrapper used by the export dispatcher.
pub fn write_xlsx(df: &DataFrame, path: &Path, sheet: &str) -> Result<(), ExportError> {
    XlsxWriter::write_file(df, path, sheet)
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Materialize one column as sheet cells; nulls become `None`.
fn cells(column: &Column) -> PolarsResult<Vec<Option<Cell>>> {
    if is_numeric(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        Ok(cast
            .as_materialized_series()
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()).map(Cell::Number))
            .collect())
    } else {
        let cast = column.cast(&DataType::String)?;
        Ok(cast
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.map(|s| Cell::Text(s.to_string())))
            .collect())
    }
}

fn text_cell(col_idx: usize, row_num: usize, value: &str) -> String {
    format!(
        r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
        column_letter(col_idx),
        row_num,
        escape(value)
    )
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA).
fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            _ => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}
