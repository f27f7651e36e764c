//! Growth Metrics Module
//! Year-over-year and quarter-over-quarter percentage change per group.
//!
//! Growth is computed by joining each period total against the total of the same
//! group in the comparison period. Row order never matters, so gaps in a series
//! produce an undefined value instead of comparing against the wrong month.

use super::grouping::{period_totals, PeriodTotals};
use crate::data::{Dimension, RegistrationTable, YearMonth, YearQuarter};
use polars::prelude::PolarsResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Percentage change of one group against its comparison period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow<P> {
    /// Dimension values, in the order they were requested.
    pub key: Vec<String>,
    pub period: P,
    pub total: u64,
    pub previous_total: Option<u64>,
    /// `None` when the comparison period is absent or zero.
    pub growth_pct: Option<f64>,
}

/// `(current - previous) / previous * 100`, undefined for a missing or zero base.
pub fn percent_change(current: u64, previous: Option<u64>) -> Option<f64> {
    let previous = previous.filter(|p| *p > 0)? as f64;
    Some((current as f64 - previous) / previous * 100.0)
}

/// Computes period-over-period growth.
pub struct GrowthCalculator;

impl GrowthCalculator {
    /// The series used for per-row growth: one per state, category and manufacturer.
    pub const DEFAULT_DIMENSIONS: [Dimension; 3] =
        [Dimension::State, Dimension::Category, Dimension::Manufacturer];

    /// Each month against the same month one year earlier.
    pub fn year_over_year(
        table: &RegistrationTable,
        dims: &[Dimension],
    ) -> PolarsResult<Vec<GrowthRow<YearMonth>>> {
        let totals = period_totals(table, dims)?;
        Ok(Self::compare(totals, YearMonth::prior_year))
    }

    /// Each quarter against the preceding quarter.
    pub fn quarter_over_quarter(
        table: &RegistrationTable,
        dims: &[Dimension],
    ) -> PolarsResult<Vec<GrowthRow<YearQuarter>>> {
        let totals = Self::quarter_totals(period_totals(table, dims)?);
        Ok(Self::compare(totals, YearQuarter::prior))
    }

    fn quarter_totals(monthly: PeriodTotals) -> BTreeMap<(Vec<String>, YearQuarter), u64> {
        let mut quarterly = BTreeMap::new();
        for ((key, period), total) in monthly {
            *quarterly.entry((key, period.quarter())).or_insert(0) += total;
        }
        quarterly
    }

    fn compare<P>(totals: BTreeMap<(Vec<String>, P), u64>, prior: fn(&P) -> P) -> Vec<GrowthRow<P>>
    where
        P: Ord + Copy,
    {
        let mut rows: Vec<GrowthRow<P>> = totals
            .iter()
            .map(|((key, period), total)| {
                let previous_total = totals.get(&(key.clone(), prior(period))).copied();
                GrowthRow {
                    key: key.clone(),
                    period: *period,
                    total: *total,
                    previous_total,
                    growth_pct: percent_change(*total, previous_total),
                }
            })
            .collect();

        rows.sort_by(|a, b| a.period.cmp(&b.period).then_with(|| a.key.cmp(&b.key)));
        rows
    }
}
