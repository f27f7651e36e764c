//! Conversion of computed results into DataFrames for tabular export.

use crate::data::{Dimension, YearMonth, YearQuarter};
use crate::stats::{CategorySummary, GrowthRow, ManufacturerStats, StateStats, TimeSeriesPoint};
use polars::prelude::*;

fn key_columns<P>(dims: &[Dimension], rows: &[GrowthRow<P>]) -> Vec<Column> {
    dims.iter()
        .enumerate()
        .map(|(i, d)| {
            Column::new(
                d.column().into(),
                rows.iter()
                    .map(|r| r.key.get(i).cloned().unwrap_or_default())
                    .collect::<Vec<String>>(),
            )
        })
        .collect()
}

pub fn category_frame(rows: &[CategorySummary]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "vehicle_category".into(),
            rows.iter().map(|r| r.category.as_str()).collect::<Vec<&str>>(),
        ),
        Column::new(
            "total_registrations".into(),
            rows.iter().map(|r| r.total_registrations).collect::<Vec<u64>>(),
        ),
        Column::new(
            "share_pct".into(),
            rows.iter().map(|r| r.share_pct).collect::<Vec<f64>>(),
        ),
        Column::new(
            "avg_monthly_registrations".into(),
            rows.iter()
                .map(|r| r.avg_monthly_registrations)
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            "latest_yoy_growth".into(),
            rows.iter()
                .map(|r| r.latest_yoy_growth)
                .collect::<Vec<Option<f64>>>(),
        ),
    ])
}

pub fn manufacturer_frame(rows: &[ManufacturerStats]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "manufacturer".into(),
            rows.iter()
                .map(|r| r.manufacturer.clone())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            "total_registrations".into(),
            rows.iter().map(|r| r.total_registrations).collect::<Vec<u64>>(),
        ),
        Column::new(
            "share_pct".into(),
            rows.iter().map(|r| r.share_pct).collect::<Vec<f64>>(),
        ),
        Column::new(
            "avg_monthly_registrations".into(),
            rows.iter()
                .map(|r| r.avg_monthly_registrations)
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            "data_points".into(),
            rows.iter().map(|r| r.data_points).collect::<Vec<u64>>(),
        ),
        Column::new(
            "avg_yoy_growth".into(),
            rows.iter().map(|r| r.avg_yoy_growth).collect::<Vec<Option<f64>>>(),
        ),
        Column::new(
            "avg_qoq_growth".into(),
            rows.iter().map(|r| r.avg_qoq_growth).collect::<Vec<Option<f64>>>(),
        ),
    ])
}

pub fn state_frame(rows: &[StateStats]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "state".into(),
            rows.iter().map(|r| r.state.clone()).collect::<Vec<String>>(),
        ),
        Column::new(
            "total_registrations".into(),
            rows.iter().map(|r| r.total_registrations).collect::<Vec<u64>>(),
        ),
        Column::new(
            "share_pct".into(),
            rows.iter().map(|r| r.share_pct).collect::<Vec<f64>>(),
        ),
        Column::new(
            "avg_yoy_growth".into(),
            rows.iter().map(|r| r.avg_yoy_growth).collect::<Vec<Option<f64>>>(),
        ),
    ])
}

pub fn yoy_frame(dims: &[Dimension], rows: &[GrowthRow<YearMonth>]) -> PolarsResult<DataFrame> {
    let mut columns = key_columns(dims, rows);
    columns.extend([
        Column::new(
            "year".into(),
            rows.iter().map(|r| r.period.year).collect::<Vec<i32>>(),
        ),
        Column::new(
            "month".into(),
            rows.iter().map(|r| r.period.month).collect::<Vec<u32>>(),
        ),
        Column::new(
            "total_registrations".into(),
            rows.iter().map(|r| r.total).collect::<Vec<u64>>(),
        ),
        Column::new(
            "previous_total".into(),
            rows.iter().map(|r| r.previous_total).collect::<Vec<Option<u64>>>(),
        ),
        Column::new(
            "yoy_growth".into(),
            rows.iter().map(|r| r.growth_pct).collect::<Vec<Option<f64>>>(),
        ),
    ]);
    DataFrame::new(columns)
}

pub fn qoq_frame(dims: &[Dimension], rows: &[GrowthRow<YearQuarter>]) -> PolarsResult<DataFrame> {
    let mut columns = key_columns(dims, rows);
    columns.extend([
        Column::new(
            "year".into(),
            rows.iter().map(|r| r.period.year).collect::<Vec<i32>>(),
        ),
        Column::new(
            "quarter".into(),
            rows.iter().map(|r| r.period.quarter).collect::<Vec<u32>>(),
        ),
        Column::new(
            "total_registrations".into(),
            rows.iter().map(|r| r.total).collect::<Vec<u64>>(),
        ),
        Column::new(
            "previous_total".into(),
            rows.iter().map(|r| r.previous_total).collect::<Vec<Option<u64>>>(),
        ),
        Column::new(
            "qoq_growth".into(),
            rows.iter().map(|r| r.growth_pct).collect::<Vec<Option<f64>>>(),
        ),
    ]);
    DataFrame::new(columns)
}

pub fn timeseries_frame(
    dimension: Option<Dimension>,
    points: &[TimeSeriesPoint],
) -> PolarsResult<DataFrame> {
    let mut columns = Vec::new();
    if let Some(dimension) = dimension {
        columns.push(Column::new(
            dimension.column().into(),
            points.iter().map(|p| p.key.clone()).collect::<Vec<Option<String>>>(),
        ));
    }
    columns.extend([
        Column::new(
            "year".into(),
            points.iter().map(|p| p.period.year).collect::<Vec<i32>>(),
        ),
        Column::new(
            "month".into(),
            points.iter().map(|p| p.period.month).collect::<Vec<u32>>(),
        ),
        Column::new(
            "total_registrations".into(),
            points.iter().map(|p| p.total).collect::<Vec<u64>>(),
        ),
        Column::new(
            "ma_3m".into(),
            points.iter().map(|p| p.ma_3m).collect::<Vec<Option<f64>>>(),
        ),
        Column::new(
            "ma_6m".into(),
            points.iter().map(|p| p.ma_6m).collect::<Vec<Option<f64>>>(),
        ),
        Column::new(
            "ma_12m".into(),
            points.iter().map(|p| p.ma_12m).collect::<Vec<Option<f64>>>(),
        ),
    ]);
    DataFrame::new(columns)
}
