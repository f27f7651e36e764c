//! Vahan Analytics - vehicle registration loading, growth metrics and exports
//!
//! Loads registration counts (year, month, state, category, class,
//! manufacturer) into a Polars-backed table, filters them and computes
//! YoY/QoQ growth, category and manufacturer summaries, KPIs and moving
//! averages. Results are exported as CSV, XLSX or a JSON report.

pub mod config;
pub mod data;
pub mod export;
pub mod report;
pub mod sample;
pub mod source;
pub mod stats;
