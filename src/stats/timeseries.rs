//! Time Series Module
//! Monthly totals per dimension value with trailing moving averages.

use super::grouping::period_totals;
use crate::data::{Dimension, RegistrationTable, YearMonth};
use polars::prelude::PolarsResult;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Monthly total of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub period: YearMonth,
    /// Dimension value, `None` for the overall series.
    pub key: Option<String>,
    pub total: u64,
    pub ma_3m: Option<f64>,
    pub ma_6m: Option<f64>,
    pub ma_12m: Option<f64>,
}

pub struct TimeSeriesBuilder;

impl TimeSeriesBuilder {
    /// Monthly totals split by `dimension` (or overall), ordered by month then value.
    pub fn monthly(
        table: &RegistrationTable,
        dimension: Option<Dimension>,
    ) -> PolarsResult<Vec<TimeSeriesPoint>> {
        let dims: Vec<Dimension> = dimension.into_iter().collect();

        let mut series: BTreeMap<Option<String>, BTreeMap<YearMonth, u64>> = BTreeMap::new();
        for ((key, period), total) in period_totals(table, &dims)? {
            series
                .entry(key.into_iter().next())
                .or_default()
                .insert(period, total);
        }

        let mut points = Vec::new();
        for (key, values) in &series {
            for (period, total) in values {
                points.push(TimeSeriesPoint {
                    period: *period,
                    key: key.clone(),
                    total: *total,
                    ma_3m: Self::moving_average(values, *period, 3),
                    ma_6m: Self::moving_average(values, *period, 6),
                    ma_12m: Self::moving_average(values, *period, 12),
                });
            }
        }

        points.sort_by(|a, b| a.period.cmp(&b.period).then_with(|| a.key.cmp(&b.key)));
        Ok(points)
    }

    /// Mean of the `window` calendar months ending at `end`; `None` if any month is missing.
    pub fn moving_average(
        values: &BTreeMap<YearMonth, u64>,
        end: YearMonth,
        window: usize,
    ) -> Option<f64> {
        let window_values: Option<Vec<f64>> = (0..window as i64)
            .map(|back| {
                values
                    .get(&YearMonth::from_index(end.index() - back))
                    .map(|v| *v as f64)
            })
            .collect();
        window_values
            .filter(|v| !v.is_empty())
            .map(|v| v.mean())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RegistrationRecord, VehicleCategory};

    fn record(year: i32, month: u32, category: VehicleCategory, count: u64) -> RegistrationRecord {
        RegistrationRecord {
            year,
            month,
            month_name: None,
            state: "MH".to_string(),
            vehicle_category: category,
            vehicle_class: "Any".to_string(),
            manufacturer: "Any".to_string(),
            registration_count: count,
        }
    }

    #[test]
    fn ordered_chronologically_then_by_value() {
        let table = RegistrationTable::from_records(&[
            record(2023, 2, VehicleCategory::FourWheeler, 4),
            record(2023, 1, VehicleCategory::FourWheeler, 3),
            record(2023, 1, VehicleCategory::TwoWheeler, 9),
            record(2022, 12, VehicleCategory::TwoWheeler, 8),
        ])
        .unwrap();
        let points = TimeSeriesBuilder::monthly(&table, Some(Dimension::Category)).unwrap();

        let order: Vec<(String, Option<&str>)> = points
            .iter()
            .map(|p| (p.period.to_string(), p.key.as_deref()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2022-12".to_string(), Some("2W")),
                ("2023-01".to_string(), Some("2W")),
                ("2023-01".to_string(), Some("4W")),
                ("2023-02".to_string(), Some("4W")),
            ]
        );
    }

    #[test]
    fn overall_series_has_no_key() {
        let table = RegistrationTable::from_records(&[
            record(2023, 1, VehicleCategory::FourWheeler, 3),
            record(2023, 1, VehicleCategory::TwoWheeler, 9),
        ])
        .unwrap();
        let points = TimeSeriesBuilder::monthly(&table, None).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].key, None);
        assert_eq!(points[0].total, 12);
    }

    #[test]
    fn moving_average_needs_a_full_window() {
        let rows: Vec<RegistrationRecord> = [(2022, 11, 30), (2022, 12, 60), (2023, 1, 90), (2023, 3, 10)]
            .into_iter()
            .map(|(y, m, c)| record(y, m, VehicleCategory::TwoWheeler, c))
            .collect();
        let table = RegistrationTable::from_records(&rows).unwrap();
        let points = TimeSeriesBuilder::monthly(&table, None).unwrap();

        assert_eq!(points[0].ma_3m, None);
        assert_eq!(points[1].ma_3m, None);
        assert_eq!(points[2].ma_3m, Some(60.0));
        // February is missing.
        assert_eq!(points[3].ma_3m, None);
        assert!(points.iter().all(|p| p.ma_12m.is_none()));
    }
}
