//! Data Processor Module
//! Filter specification and its application to a registration table.

use super::schema::{
    Dimension, ParseError, VehicleCategory, YearMonth, COL_CATEGORY, COL_MANUFACTURER, COL_MONTH,
    COL_STATE, COL_YEAR,
};
use super::table::{RegistrationTable, TableDomain};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown {dimension} '{value}'")]
    UnknownValue { dimension: Dimension, value: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Date range start {start} is after end {end}")]
    InvertedRange { start: YearMonth, end: YearMonth },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Active filter selection. Unset options impose no constraint.
///
/// Each dimension holds a multi-select: a row matches when its value is any of
/// the selected ones. A single value is the one-element case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Inclusive month range.
    pub date_range: Option<(YearMonth, YearMonth)>,
    pub categories: Vec<VehicleCategory>,
    pub states: Vec<String>,
    pub manufacturers: Vec<String>,
}

impl FilterSpec {
    pub fn with_date_range(mut self, start: YearMonth, end: YearMonth) -> Self {
        self.date_range = Some((start, end));
        self
    }

    /// Adds `category` to the selection.
    pub fn with_category(mut self, category: VehicleCategory) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        push_unique(&mut self.states, state.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        push_unique(&mut self.manufacturers, manufacturer.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.categories.is_empty()
            && self.states.is_empty()
            && self.manufacturers.is_empty()
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// OR of equality tests against `values`, or `None` for an empty selection.
fn any_of<I>(column: &str, values: I) -> Option<Expr>
where
    I: IntoIterator<Item = String>,
{
    values
        .into_iter()
        .map(|v| col(column).eq(lit(v)))
        .reduce(|acc, p| acc.or(p))
}

/// Applies filter specifications.
pub struct DataProcessor;

impl DataProcessor {
    /// Check every filter value against the loaded domain so typos surface as errors.
    pub fn validate(spec: &FilterSpec, domain: &TableDomain) -> Result<(), FilterError> {
        if let Some((start, end)) = spec.date_range {
            if start > end {
                return Err(FilterError::InvertedRange { start, end });
            }
        }

        let checks = spec
            .categories
            .iter()
            .map(|c| (Dimension::Category, c.as_str()))
            .chain(spec.states.iter().map(|s| (Dimension::State, s.as_str())))
            .chain(
                spec.manufacturers
                    .iter()
                    .map(|m| (Dimension::Manufacturer, m.as_str())),
            );
        for (dimension, value) in checks {
            if !domain.contains(dimension, value) {
                return Err(FilterError::UnknownValue {
                    dimension,
                    value: value.to_string(),
                });
            }
        }

        Ok(())
    }

    /// AND of all set predicates, or `None` when nothing is set.
    pub fn filter_expr(spec: &FilterSpec) -> Option<Expr> {
        let mut predicates = Vec::new();

        if let Some((start, end)) = spec.date_range {
            let index = col(COL_YEAR).cast(DataType::Int64) * lit(12i64)
                + col(COL_MONTH).cast(DataType::Int64)
                - lit(1i64);
            predicates.push(
                index
                    .clone()
                    .gt_eq(lit(start.index()))
                    .and(index.lt_eq(lit(end.index()))),
            );
        }
        predicates.extend(any_of(
            COL_CATEGORY,
            spec.categories.iter().map(|c| c.as_str().to_string()),
        ));
        predicates.extend(any_of(COL_STATE, spec.states.iter().cloned()));
        predicates.extend(any_of(COL_MANUFACTURER, spec.manufacturers.iter().cloned()));

        predicates.into_iter().reduce(|acc, p| acc.and(p))
    }

    /// Rows matching every set predicate, as a new table.
    pub fn apply_filter(
        table: &RegistrationTable,
        spec: &FilterSpec,
    ) -> Result<RegistrationTable, FilterError> {
        Self::validate(spec, table.domain())?;

        let Some(predicate) = Self::filter_expr(spec) else {
            return Ok(table.clone());
        };

        let filtered = table.dataframe().clone().lazy().filter(predicate).collect()?;
        debug!(rows_in = table.height(), rows_out = filtered.height(), "Applied filter");
        Ok(RegistrationTable::from_frame(filtered)?)
    }
}
