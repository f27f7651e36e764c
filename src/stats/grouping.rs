//! Group-by-sum helpers shared by the metric calculators.

use crate::data::schema::{COL_COUNT, COL_MONTH, COL_YEAR};
use crate::data::{
    int_values, string_values, uint_values, Dimension, RegistrationTable, YearMonth,
};
use polars::prelude::*;
use std::collections::BTreeMap;

const TOTAL: &str = "total";
const ROWS: &str = "rows";

/// Sum of `registration_count` for one combination of dimension values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GroupTotal {
    /// Values in the order of the requested dimensions.
    pub key: Vec<String>,
    pub total: u64,
    pub rows: u64,
}

/// Totals keyed by dimension values plus calendar month.
pub(crate) type PeriodTotals = BTreeMap<(Vec<String>, YearMonth), u64>;

/// Group the table by `dims` and sum registrations.
pub(crate) fn dimension_totals(
    table: &RegistrationTable,
    dims: &[Dimension],
) -> PolarsResult<Vec<GroupTotal>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    if dims.is_empty() {
        return Ok(vec![GroupTotal {
            key: Vec::new(),
            total: table.total_registrations()?,
            rows: table.height() as u64,
        }]);
    }

    let by: Vec<Expr> = dims.iter().map(|d| col(d.column())).collect();
    let grouped = table
        .dataframe()
        .clone()
        .lazy()
        .group_by(by)
        .agg([
            col(COL_COUNT).sum().alias(TOTAL),
            col(COL_COUNT).count().alias(ROWS),
        ])
        .collect()?;

    let keys = dims
        .iter()
        .map(|d| string_values(&grouped, d.column()))
        .collect::<PolarsResult<Vec<_>>>()?;
    let totals = uint_values(&grouped, TOTAL)?;
    let rows = uint_values(&grouped, ROWS)?;

    Ok((0..grouped.height())
        .map(|i| GroupTotal {
            key: keys
                .iter()
                .map(|k| k[i].clone().unwrap_or_default())
                .collect(),
            total: totals[i].unwrap_or(0),
            rows: rows[i].unwrap_or(0),
        })
        .collect())
}

/// Group the table by `dims` and calendar month and sum registrations.
pub(crate) fn period_totals(
    table: &RegistrationTable,
    dims: &[Dimension],
) -> PolarsResult<PeriodTotals> {
    let mut result = BTreeMap::new();
    if table.is_empty() {
        return Ok(result);
    }

    let mut by: Vec<Expr> = dims.iter().map(|d| col(d.column())).collect();
    by.push(col(COL_YEAR));
    by.push(col(COL_MONTH));

    let grouped = table
        .dataframe()
        .clone()
        .lazy()
        .group_by(by)
        .agg([col(COL_COUNT).sum().alias(TOTAL)])
        .collect()?;

    let keys = dims
        .iter()
        .map(|d| string_values(&grouped, d.column()))
        .collect::<PolarsResult<Vec<_>>>()?;
    let years = int_values(&grouped, COL_YEAR)?;
    let months = int_values(&grouped, COL_MONTH)?;
    let totals = uint_values(&grouped, TOTAL)?;

    for i in 0..grouped.height() {
        let period = years[i]
            .zip(months[i])
            .and_then(|(y, m)| YearMonth::new(y as i32, m as u32));
        let Some(period) = period else {
            continue;
        };
        let key = keys
            .iter()
            .map(|k| k[i].clone().unwrap_or_default())
            .collect();
        result.insert((key, period), totals[i].unwrap_or(0));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RegistrationRecord, VehicleCategory};

    fn record(year: i32, month: u32, state: &str, class: &str, count: u64) -> RegistrationRecord {
        RegistrationRecord {
            year,
            month,
            month_name: None,
            state: state.to_string(),
            vehicle_category: VehicleCategory::TwoWheeler,
            vehicle_class: class.to_string(),
            manufacturer: "Honda".to_string(),
            registration_count: count,
        }
    }

    fn table() -> RegistrationTable {
        RegistrationTable::from_records(&[
            record(2023, 1, "MH", "Scooter", 10),
            record(2023, 1, "MH", "Moped", 5),
            record(2023, 2, "MH", "Scooter", 7),
            record(2023, 1, "KA", "Scooter", 3),
        ])
        .unwrap()
    }

    #[test]
    fn sums_by_dimension() {
        let mut totals = dimension_totals(&table(), &[Dimension::State]).unwrap();
        totals.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(
            totals,
            vec![
                GroupTotal {
                    key: vec!["KA".to_string()],
                    total: 3,
                    rows: 1
                },
                GroupTotal {
                    key: vec!["MH".to_string()],
                    total: 22,
                    rows: 3
                },
            ]
        );
    }

    #[test]
    fn no_dimensions_means_one_grand_total() {
        let totals = dimension_totals(&table(), &[]).unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total, 25);
        assert_eq!(totals[0].rows, 4);
    }

    #[test]
    fn period_totals_collapse_vehicle_classes() {
        let totals = period_totals(&table(), &[Dimension::State]).unwrap();
        let jan = YearMonth::new(2023, 1).unwrap();
        let feb = YearMonth::new(2023, 2).unwrap();

        assert_eq!(totals.len(), 3);
        assert_eq!(totals[&(vec!["MH".to_string()], jan)], 15);
        assert_eq!(totals[&(vec!["MH".to_string()], feb)], 7);
        assert_eq!(totals[&(vec!["KA".to_string()], jan)], 3);
    }

    #[test]
    fn large_counts_keep_group_sums_exact() {
        let big = 4_000_000_000_000_000_000u64;
        let table = RegistrationTable::from_records(&[
            record(2023, 1, "MH", "Scooter", big),
            record(2023, 2, "MH", "Scooter", big),
            record(2023, 3, "KA", "Scooter", big),
        ])
        .unwrap();

        let by_category = dimension_totals(&table, &[Dimension::Category]).unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].total, 3 * big);
        assert_eq!(by_category[0].total, table.total_registrations().unwrap());

        let by_month = period_totals(&table, &[]).unwrap();
        assert_eq!(by_month.values().sum::<u64>(), 3 * big);
    }

    #[test]
    fn empty_table_groups_to_nothing() {
        let empty = RegistrationTable::from_records(&[]).unwrap();
        assert!(dimension_totals(&empty, &[Dimension::State]).unwrap().is_empty());
        assert!(period_totals(&empty, &[]).unwrap().is_empty());
    }
}
