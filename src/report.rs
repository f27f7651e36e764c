//! Dashboard Report Module
//! Everything the presentation layer shows for one filter selection.

use crate::data::{DataProcessor, Dimension, FilterError, FilterSpec, RegistrationTable};
use crate::stats::{
    CategorySummary, Kpis, ManufacturerStats, MetricsCalculator, StateStats, TimeSeriesBuilder,
    TimeSeriesPoint,
};
use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub filter: FilterSpec,
    pub rows: usize,
    pub kpis: Kpis,
    pub categories: Vec<CategorySummary>,
    /// Top manufacturers only.
    pub manufacturers: Vec<ManufacturerStats>,
    pub states: Vec<StateStats>,
    /// Monthly totals per vehicle category.
    pub category_trend: Vec<TimeSeriesPoint>,
}

impl DashboardReport {
    /// Filter the table and compute every section.
    pub fn build(
        table: &RegistrationTable,
        filter: &FilterSpec,
        top_n: usize,
    ) -> Result<Self, ReportError> {
        let filtered = DataProcessor::apply_filter(table, filter)?;

        let mut manufacturers = MetricsCalculator::manufacturer_analysis(&filtered)?;
        manufacturers.truncate(top_n);

        let report = Self {
            filter: filter.clone(),
            rows: filtered.height(),
            kpis: MetricsCalculator::kpis(&filtered)?,
            categories: MetricsCalculator::category_summary(&filtered)?,
            manufacturers,
            states: MetricsCalculator::state_analysis(&filtered, top_n)?,
            category_trend: TimeSeriesBuilder::monthly(&filtered, Some(Dimension::Category))?,
        };
        info!(rows = report.rows, "Built dashboard report");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RegistrationRecord, VehicleCategory};

    fn table() -> RegistrationTable {
        let rows: Vec<RegistrationRecord> = ["Honda", "Hero", "TVS"]
            .iter()
            .enumerate()
            .map(|(i, m)| RegistrationRecord {
                year: 2023,
                month: 1,
                month_name: Some("January".to_string()),
                state: "MH".to_string(),
                vehicle_category: VehicleCategory::TwoWheeler,
                vehicle_class: "Scooter".to_string(),
                manufacturer: m.to_string(),
                registration_count: 10 * (i as u64 + 1),
            })
            .collect();
        RegistrationTable::from_records(&rows).unwrap()
    }

    #[test]
    fn report_truncates_manufacturers_to_top_n() {
        let report = DashboardReport::build(&table(), &FilterSpec::default(), 2).unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.kpis.total_registrations, 60);
        let names: Vec<&str> = report.manufacturers.iter().map(|m| m.manufacturer.as_str()).collect();
        assert_eq!(names, vec!["TVS", "Hero"]);
        assert_eq!(report.category_trend.len(), 1);
    }

    #[test]
    fn report_surfaces_filter_errors() {
        let spec = FilterSpec::default().with_manufacturer("Yamaha");
        assert!(matches!(
            DashboardReport::build(&table(), &spec, 5),
            Err(ReportError::Filter(FilterError::UnknownValue { .. }))
        ));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = DashboardReport::build(&table(), &FilterSpec::default(), 5).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["categories"][0]["category"], "2W");
        assert_eq!(json["kpis"]["latest_period"]["month"], 1);
    }
}
