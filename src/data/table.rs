//! Registration Table Module
//! Typed wrapper around the polars DataFrame that holds validated registrations.

use super::schema::{
    Dimension, RegistrationRecord, VehicleCategory, YearMonth, COL_CATEGORY, COL_CLASS, COL_COUNT,
    COL_MANUFACTURER, COL_MONTH, COL_MONTH_NAME, COL_STATE, COL_YEAR,
};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Distinct dimension values present in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableDomain {
    pub states: BTreeSet<String>,
    pub categories: BTreeSet<VehicleCategory>,
    pub vehicle_classes: BTreeSet<String>,
    pub manufacturers: BTreeSet<String>,
    pub first_period: Option<YearMonth>,
    pub last_period: Option<YearMonth>,
}

impl TableDomain {
    /// Whether `value` occurs in the given dimension.
    pub fn contains(&self, dimension: Dimension, value: &str) -> bool {
        match dimension {
            Dimension::State => self.states.contains(value),
            Dimension::Class => self.vehicle_classes.contains(value),
            Dimension::Manufacturer => self.manufacturers.contains(value),
            Dimension::Category => value
                .parse::<VehicleCategory>()
                .map(|c| self.categories.contains(&c))
                .unwrap_or(false),
        }
    }

    fn from_frame(df: &DataFrame) -> PolarsResult<Self> {
        let collect = |name: &str| -> PolarsResult<BTreeSet<String>> {
            Ok(string_values(df, name)?.into_iter().flatten().collect())
        };

        let years = int_values(df, COL_YEAR)?;
        let months = int_values(df, COL_MONTH)?;
        let periods: BTreeSet<YearMonth> = years
            .iter()
            .zip(months.iter())
            .filter_map(|(y, m)| YearMonth::new((*y)? as i32, (*m)? as u32))
            .collect();

        Ok(Self {
            states: collect(COL_STATE)?,
            categories: collect(COL_CATEGORY)?
                .iter()
                .filter_map(|c| c.parse().ok())
                .collect(),
            vehicle_classes: collect(COL_CLASS)?,
            manufacturers: collect(COL_MANUFACTURER)?,
            first_period: periods.first().copied(),
            last_period: periods.last().copied(),
        })
    }
}

/// An immutable table of registrations. Every transformation produces a new table.
#[derive(Debug, Clone)]
pub struct RegistrationTable {
    df: DataFrame,
    domain: TableDomain,
    total: u64,
}

impl RegistrationTable {
    /// Build the canonical frame from rows.
    ///
    /// The `month_name` column is only materialized when at least one row carries it.
    pub fn from_records(records: &[RegistrationRecord]) -> PolarsResult<Self> {
        let has_month_name = records.iter().any(|r| r.month_name.is_some());
        Self::from_rows(records, has_month_name)
    }

    /// Build the canonical frame from rows, with or without a `month_name` column
    /// regardless of whether any row has a value for it.
    pub fn from_rows(records: &[RegistrationRecord], has_month_name: bool) -> PolarsResult<Self> {
        let mut columns = vec![
            Column::new(
                COL_YEAR.into(),
                records.iter().map(|r| r.year).collect::<Vec<i32>>(),
            ),
            Column::new(
                COL_MONTH.into(),
                records.iter().map(|r| r.month).collect::<Vec<u32>>(),
            ),
        ];
        if has_month_name {
            columns.push(Column::new(
                COL_MONTH_NAME.into(),
                records
                    .iter()
                    .map(|r| r.month_name.clone())
                    .collect::<Vec<Option<String>>>(),
            ));
        }
        columns.extend([
            Column::new(
                COL_STATE.into(),
                records.iter().map(|r| r.state.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                COL_CATEGORY.into(),
                records
                    .iter()
                    .map(|r| r.vehicle_category.as_str())
                    .collect::<Vec<&str>>(),
            ),
            Column::new(
                COL_CLASS.into(),
                records
                    .iter()
                    .map(|r| r.vehicle_class.clone())
                    .collect::<Vec<String>>(),
            ),
            Column::new(
                COL_MANUFACTURER.into(),
                records
                    .iter()
                    .map(|r| r.manufacturer.clone())
                    .collect::<Vec<String>>(),
            ),
            Column::new(
                COL_COUNT.into(),
                records
                    .iter()
                    .map(|r| r.registration_count)
                    .collect::<Vec<u64>>(),
            ),
        ]);

        Self::from_frame(DataFrame::new(columns)?)
    }

    /// Wrap a frame that already has the canonical columns (e.g. a filtered copy).
    ///
    /// Fails when the grand total does not fit in a `u64`, so no group sum over
    /// the table can overflow either.
    pub(crate) fn from_frame(df: DataFrame) -> PolarsResult<Self> {
        let domain = TableDomain::from_frame(&df)?;
        let total = uint_values(&df, COL_COUNT)?
            .into_iter()
            .flatten()
            .try_fold(0u64, |acc, v| acc.checked_add(v))
            .ok_or_else(|| {
                PolarsError::ComputeError("registration total overflows u64".into())
            })?;
        Ok(Self { df, domain, total })
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn domain(&self) -> &TableDomain {
        &self.domain
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn has_month_name(&self) -> bool {
        self.df
            .get_column_names()
            .iter()
            .any(|name| name.as_str() == COL_MONTH_NAME)
    }

    /// Sum of `registration_count` over all rows.
    pub fn total_registrations(&self) -> PolarsResult<u64> {
        Ok(self.total)
    }

    /// Materialize the rows.
    pub fn records(&self) -> PolarsResult<Vec<RegistrationRecord>> {
        let height = self.df.height();
        let years = int_values(&self.df, COL_YEAR)?;
        let months = int_values(&self.df, COL_MONTH)?;
        let month_names = if self.has_month_name() {
            string_values(&self.df, COL_MONTH_NAME)?
        } else {
            vec![None; height]
        };
        let states = string_values(&self.df, COL_STATE)?;
        let categories = string_values(&self.df, COL_CATEGORY)?;
        let classes = string_values(&self.df, COL_CLASS)?;
        let manufacturers = string_values(&self.df, COL_MANUFACTURER)?;
        let counts = uint_values(&self.df, COL_COUNT)?;

        let missing = |column: &str, row: usize| {
            PolarsError::ComputeError(format!("missing {column} at row {row}").into())
        };

        let mut records = Vec::with_capacity(height);
        for i in 0..height {
            let vehicle_category = categories[i]
                .as_deref()
                .and_then(|c| c.parse::<VehicleCategory>().ok())
                .ok_or_else(|| missing(COL_CATEGORY, i))?;

            records.push(RegistrationRecord {
                year: years[i].ok_or_else(|| missing(COL_YEAR, i))? as i32,
                month: months[i].ok_or_else(|| missing(COL_MONTH, i))? as u32,
                month_name: month_names[i].clone(),
                state: states[i].clone().ok_or_else(|| missing(COL_STATE, i))?,
                vehicle_category,
                vehicle_class: classes[i].clone().ok_or_else(|| missing(COL_CLASS, i))?,
                manufacturer: manufacturers[i]
                    .clone()
                    .ok_or_else(|| missing(COL_MANUFACTURER, i))?,
                registration_count: counts[i].ok_or_else(|| missing(COL_COUNT, i))?,
            });
        }

        Ok(records)
    }
}

impl PartialEq for RegistrationTable {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

/// Values of a column rendered as strings.
pub(crate) fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Values of an integer column widened to i64.
pub(crate) fn int_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    let values = column.as_materialized_series().i64()?.into_iter().collect();
    Ok(values)
}

/// Values of a count or sum column as u64. Negative or out-of-range values are an error.
pub(crate) fn uint_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<u64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .strict_cast(&DataType::UInt64)?;
    let values = series.u64()?.into_iter().collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, month: u32, state: &str, count: u64) -> RegistrationRecord {
        RegistrationRecord {
            year,
            month,
            month_name: None,
            state: state.to_string(),
            vehicle_category: VehicleCategory::TwoWheeler,
            vehicle_class: "Scooter".to_string(),
            manufacturer: "Honda".to_string(),
            registration_count: count,
        }
    }

    #[test]
    fn records_survive_the_frame() {
        let rows = vec![record(2022, 3, "MH", 100), record(2023, 4, "KA", 150)];
        let table = RegistrationTable::from_records(&rows).unwrap();

        assert_eq!(table.height(), 2);
        assert!(!table.has_month_name());
        assert_eq!(table.records().unwrap(), rows);
        assert_eq!(table.total_registrations().unwrap(), 250);
    }

    #[test]
    fn domain_lists_distinct_values_and_period_bounds() {
        let rows = vec![
            record(2023, 4, "KA", 1),
            record(2022, 3, "MH", 1),
            record(2022, 5, "MH", 1),
        ];
        let table = RegistrationTable::from_records(&rows).unwrap();
        let domain = table.domain();

        assert_eq!(domain.states.len(), 2);
        assert!(domain.contains(Dimension::State, "MH"));
        assert!(!domain.contains(Dimension::State, "DL"));
        assert!(domain.contains(Dimension::Category, "2W"));
        assert!(!domain.contains(Dimension::Category, "4W"));
        assert_eq!(domain.first_period, YearMonth::new(2022, 3));
        assert_eq!(domain.last_period, YearMonth::new(2023, 4));
    }

    #[test]
    fn month_name_column_follows_the_flag() {
        let rows = vec![record(2023, 1, "MH", 1)];
        let with = RegistrationTable::from_rows(&rows, true).unwrap();
        let without = RegistrationTable::from_rows(&rows, false).unwrap();

        assert!(with.has_month_name());
        assert!(!without.has_month_name());
        assert_eq!(with.records().unwrap(), without.records().unwrap());
        assert_ne!(with, without);
    }

    #[test]
    fn totals_near_the_u64_limit_are_exact() {
        let big = 4_000_000_000_000_000_000u64;
        let rows = vec![
            record(2023, 1, "MH", big),
            record(2023, 2, "MH", big),
            record(2023, 3, "KA", big),
        ];
        let table = RegistrationTable::from_records(&rows).unwrap();

        assert_eq!(table.total_registrations().unwrap(), 3 * big);
        assert_eq!(table.records().unwrap(), rows);
    }

    #[test]
    fn total_overflowing_u64_is_an_error() {
        let rows = vec![record(2023, 1, "MH", u64::MAX), record(2023, 2, "MH", 1)];
        assert!(RegistrationTable::from_records(&rows).is_err());
    }

    #[test]
    fn empty_table_has_empty_domain() {
        let table = RegistrationTable::from_records(&[]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.domain(), &TableDomain::default());
        assert_eq!(table.total_registrations().unwrap(), 0);
    }
}
