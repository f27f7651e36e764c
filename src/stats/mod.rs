//! Stats module - growth metrics and aggregations

mod calculator;
mod grouping;
mod growth;
mod timeseries;

pub use calculator::{
    CategorySummary, Kpis, ManufacturerStats, MetricsCalculator, Performer, StateStats,
    TOP_PER_CATEGORY,
};
pub use growth::{percent_change, GrowthCalculator, GrowthRow};
pub use timeseries::{TimeSeriesBuilder, TimeSeriesPoint};
