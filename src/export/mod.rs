//! Export module - CSV, XLSX and JSON output of tables and results

mod csv;
mod frames;
mod xlsx;

pub use csv::{csv_bytes, write_csv};
pub use frames::{
    category_frame, manufacturer_frame, qoq_frame, state_frame, timeseries_frame, yoy_frame,
};
pub use xlsx::{write_xlsx, XlsxWriter};

use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("ZIP error: {0}")]
    Zip(#[from] ::zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
        }
    }
}

/// Pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ExportError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Write a result set in the requested format.
///
/// Tabular formats use `frame`; JSON serializes `rows` directly so nested
/// fields survive.
pub fn export<T: Serialize + ?Sized>(
    rows: &T,
    frame: &DataFrame,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(frame, BufWriter::new(File::create(path)?))?,
        ExportFormat::Xlsx => {
            let sheet = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            write_xlsx(frame, path, &sheet)?
        }
        ExportFormat::Json => write_json(rows, path)?,
    }
    info!(path = %path.display(), format = format.extension(), "Exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Performer;

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.xlsx")), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_path(Path::new("r.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
        assert_eq!(ExportFormat::from_path(Path::new("x.parquet")), None);
    }

    #[test]
    fn json_export_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.json");
        let rows = vec![Performer {
            name: "Honda".to_string(),
            total_registrations: 42,
        }];
        let frame = DataFrame::empty();

        export(&rows, &frame, &path, ExportFormat::Json).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["name"], "Honda");
        assert_eq!(value[0]["total_registrations"], 42);
    }

    #[test]
    fn csv_export_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.csv");
        let frame = DataFrame::new(vec![
            Column::new("state".into(), vec!["Goa"]),
            Column::new("total_registrations".into(), vec![7u64]),
        ])
        .unwrap();

        export(&(), &frame, &path, ExportFormat::Csv).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "state,total_registrations\nGoa,7\n");
    }
}
