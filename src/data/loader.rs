//! CSV Data Loader Module
//! Reads registration CSVs with Polars, validates the schema and coerces row values.

use super::schema::{
    RegistrationRecord, VehicleCategory, COL_CATEGORY, COL_CLASS, COL_COUNT, COL_MANUFACTURER,
    COL_MONTH, COL_MONTH_NAME, COL_STATE, COL_YEAR, REQUIRED_COLUMNS,
};
use super::table::{string_values, RegistrationTable};
use crate::source::{FileSource, RegistrationSource, SourceError};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How many offending row numbers a `DataType` error lists.
const MAX_REPORTED_ROWS: usize = 10;
/// How many rejection reasons a load report keeps.
const MAX_REPORTED_REJECTIONS: usize = 20;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Column '{column}' has {count} non-integer value(s), first at rows {rows:?}")]
    DataType {
        column: String,
        rows: Vec<usize>,
        count: usize,
    },
    #[error("{rejected} row(s) failed validation")]
    InvalidValue { rejected: usize },
    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("No data loaded")]
    NoData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail the whole load when any row is rejected.
    pub strict: bool,
}

/// A row that was dropped during validation. `row` is the 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: String,
}

/// What happened while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_rejected: usize,
    /// First few rejections, for display.
    pub rejections: Vec<RejectedRow>,
}

/// Loads registration data and caches it until an explicit reload.
pub struct DataLoader {
    options: LoadOptions,
    table: Option<RegistrationTable>,
    report: Option<LoadReport>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}

impl DataLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            table: None,
            report: None,
        }
    }

    /// Return the cached table, loading from `source` on first use.
    pub fn load(&mut self, source: &dyn RegistrationSource) -> Result<&RegistrationTable, LoaderError> {
        if self.table.is_none() {
            return self.reload(source);
        }
        self.table.as_ref().ok_or(LoaderError::NoData)
    }

    /// Load from `source` and replace the cache. On failure the previous table is kept.
    pub fn reload(&mut self, source: &dyn RegistrationSource) -> Result<&RegistrationTable, LoaderError> {
        let (table, report) = load_from_source(source, &self.options)?;
        self.table = Some(table);
        self.report = Some(report);
        self.table.as_ref().ok_or(LoaderError::NoData)
    }

    /// Load a CSV file from disk.
    pub fn load_csv(&mut self, file_path: impl AsRef<Path>) -> Result<&RegistrationTable, LoaderError> {
        self.load(&FileSource::new(file_path.as_ref()))
    }

    pub fn get_table(&self) -> Option<&RegistrationTable> {
        self.table.as_ref()
    }

    pub fn get_report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }

    pub fn get_row_count(&self) -> usize {
        self.table.as_ref().map(|t| t.height()).unwrap_or(0)
    }
}

/// Fetch bytes from `source` and parse them.
pub fn load_from_source(
    source: &dyn RegistrationSource,
    options: &LoadOptions,
) -> Result<(RegistrationTable, LoadReport), LoaderError> {
    let name = source.name();
    let unavailable = |reason: String| LoaderError::SourceUnavailable {
        source_name: name.clone(),
        reason,
    };

    let bytes = source.fetch().map_err(|e| match e {
        SourceError::Io(io) if !source.is_live() => LoaderError::Io(io),
        other => unavailable(other.to_string()),
    })?;

    match parse_csv(&bytes, options) {
        Ok((table, mut report)) => {
            report.source = name.clone();
            info!(
                source = %name,
                rows = report.rows_loaded,
                rejected = report.rows_rejected,
                "Loaded registrations"
            );
            Ok((table, report))
        }
        Err(LoaderError::Schema(reason)) if source.is_live() => Err(unavailable(reason)),
        Err(e) => Err(e),
    }
}

/// Parse CSV bytes into a validated table.
pub fn parse_csv(
    bytes: &[u8],
    options: &LoadOptions,
) -> Result<(RegistrationTable, LoadReport), LoaderError> {
    // Every column comes in as text; coercion happens below so bad rows can be named.
    let read_options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0));
    let raw = read_options
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| LoaderError::Schema(format!("unreadable CSV: {e}")))?;

    let present: HashSet<String> = raw
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.contains(*c))
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::Schema(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let years = parse_int_column(&raw, COL_YEAR)?;
    let months = parse_int_column(&raw, COL_MONTH)?;
    let counts = parse_int_column(&raw, COL_COUNT)?;

    let has_month_name = present.contains(COL_MONTH_NAME);
    let month_names = if has_month_name {
        string_values(&raw, COL_MONTH_NAME)?
    } else {
        vec![None; raw.height()]
    };
    let states = string_values(&raw, COL_STATE)?;
    let categories = string_values(&raw, COL_CATEGORY)?;
    let classes = string_values(&raw, COL_CLASS)?;
    let manufacturers = string_values(&raw, COL_MANUFACTURER)?;

    let mut records = Vec::with_capacity(raw.height());
    let mut rejections = Vec::new();
    let mut seen = HashSet::new();

    for i in 0..raw.height() {
        let row = i + 1;
        let fields = RawRow {
            year: years[i],
            month: months[i],
            month_name: month_names[i].as_deref(),
            state: states[i].as_deref(),
            category: categories[i].as_deref(),
            class: classes[i].as_deref(),
            manufacturer: manufacturers[i].as_deref(),
            count: counts[i],
        };

        let record = match fields.validate() {
            Ok(record) => record,
            Err(reason) => {
                debug!(row, %reason, "Rejected row");
                rejections.push(RejectedRow { row, reason });
                continue;
            }
        };

        let key = (
            record.year,
            record.month,
            record.state.clone(),
            record.vehicle_category,
            record.vehicle_class.clone(),
            record.manufacturer.clone(),
        );
        if !seen.insert(key) {
            rejections.push(RejectedRow {
                row,
                reason: "duplicate dimensional key".to_string(),
            });
            continue;
        }

        records.push(record);
    }

    if !rejections.is_empty() {
        warn!(rejected = rejections.len(), "Rows failed validation");
        if options.strict {
            return Err(LoaderError::InvalidValue {
                rejected: rejections.len(),
            });
        }
    }

    let report = LoadReport {
        source: String::new(),
        rows_read: raw.height(),
        rows_loaded: records.len(),
        rows_rejected: rejections.len(),
        rejections: rejections
            .into_iter()
            .take(MAX_REPORTED_REJECTIONS)
            .collect(),
    };

    Ok((RegistrationTable::from_rows(&records, has_month_name)?, report))
}

/// Parse an integer column, failing with the offending row numbers.
/// Empty cells count as non-integer.
fn parse_int_column(df: &DataFrame, column: &str) -> Result<Vec<i64>, LoaderError> {
    let raw = string_values(df, column)?;
    let mut values = Vec::with_capacity(raw.len());
    let mut bad_rows = Vec::new();

    for (i, cell) in raw.iter().enumerate() {
        match cell.as_deref().map(str::trim).and_then(|v| v.parse::<i64>().ok()) {
            Some(v) => values.push(v),
            None => bad_rows.push(i + 1),
        }
    }

    if bad_rows.is_empty() {
        Ok(values)
    } else {
        Err(LoaderError::DataType {
            column: column.to_string(),
            count: bad_rows.len(),
            rows: bad_rows.into_iter().take(MAX_REPORTED_ROWS).collect(),
        })
    }
}

/// One coerced but not yet validated row.
struct RawRow<'a> {
    year: i64,
    month: i64,
    month_name: Option<&'a str>,
    state: Option<&'a str>,
    category: Option<&'a str>,
    class: Option<&'a str>,
    manufacturer: Option<&'a str>,
    count: i64,
}

impl RawRow<'_> {
    fn validate(&self) -> Result<RegistrationRecord, String> {
        if !(1000..=9999).contains(&self.year) {
            return Err(format!("year {} is not a 4-digit year", self.year));
        }
        if !(1..=12).contains(&self.month) {
            return Err(format!("month {} outside 1-12", self.month));
        }
        if self.count < 0 {
            return Err(format!("negative registration_count {}", self.count));
        }

        let vehicle_category = self
            .category
            .unwrap_or_default()
            .parse::<VehicleCategory>()
            .map_err(|e| e.to_string())?;

        Ok(RegistrationRecord {
            year: self.year as i32,
            month: self.month as u32,
            month_name: self
                .month_name
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            state: required_text(COL_STATE, self.state)?,
            vehicle_category,
            vehicle_class: required_text(COL_CLASS, self.class)?,
            manufacturer: required_text(COL_MANUFACTURER, self.manufacturer)?,
            registration_count: self.count as u64,
        })
    }
}

fn required_text(column: &str, value: Option<&str>) -> Result<String, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(format!("empty {column}")),
    }
}
