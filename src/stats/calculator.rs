//! Metrics Calculator Module
//! Category, manufacturer and state summaries plus headline KPIs.

use super::growth::{GrowthCalculator, GrowthRow};
use super::grouping::{dimension_totals, period_totals, GroupTotal};
use crate::data::{Dimension, RegistrationTable, VehicleCategory, YearMonth};
use polars::prelude::PolarsResult;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::{BTreeSet, HashMap};

/// How many manufacturers and states a category summary lists.
pub const TOP_PER_CATEGORY: usize = 5;

/// Name and total of one dimension value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performer {
    pub name: String,
    pub total_registrations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: VehicleCategory,
    pub total_registrations: u64,
    /// Percentage of the filtered total.
    pub share_pct: f64,
    /// Total divided by the number of months the category appears in.
    pub avg_monthly_registrations: f64,
    pub top_manufacturers: Vec<Performer>,
    pub top_states: Vec<Performer>,
    /// Category-level YoY growth of the latest month present.
    pub latest_yoy_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManufacturerStats {
    pub manufacturer: String,
    pub total_registrations: u64,
    pub share_pct: f64,
    pub avg_monthly_registrations: f64,
    /// Number of rows contributing.
    pub data_points: u64,
    pub avg_yoy_growth: Option<f64>,
    pub avg_qoq_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateStats {
    pub state: String,
    pub total_registrations: u64,
    pub share_pct: f64,
    pub avg_yoy_growth: Option<f64>,
}

/// Headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_registrations: u64,
    pub unique_manufacturers: usize,
    pub unique_states: usize,
    pub latest_period: Option<YearMonth>,
    pub latest_month_registrations: u64,
    /// Mean of the defined YoY values in the latest month.
    pub avg_yoy_growth: Option<f64>,
}

/// Anything ranked by total descending, then name ascending.
trait Ranked {
    fn total(&self) -> u64;
    fn name(&self) -> &str;
}

impl Ranked for Performer {
    fn total(&self) -> u64 {
        self.total_registrations
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Ranked for ManufacturerStats {
    fn total(&self) -> u64 {
        self.total_registrations
    }
    fn name(&self) -> &str {
        &self.manufacturer
    }
}

impl Ranked for StateStats {
    fn total(&self) -> u64 {
        self.total_registrations
    }
    fn name(&self) -> &str {
        &self.state
    }
}

fn rank<T: Ranked>(items: &mut [T]) {
    items.sort_by(|a, b| {
        b.total()
            .cmp(&a.total())
            .then_with(|| a.name().cmp(b.name()))
    });
}

/// Mean of the values, `None` when there are none.
fn mean_of(values: Option<&Vec<f64>>) -> Option<f64> {
    values.filter(|v| !v.is_empty()).map(|v| v.iter().mean())
}

/// Defined growth values grouped by the key component at `position`.
fn growth_by<P>(rows: &[GrowthRow<P>], position: usize) -> HashMap<String, Vec<f64>> {
    let mut grouped: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        if let (Some(name), Some(growth)) = (row.key.get(position), row.growth_pct) {
            grouped.entry(name.clone()).or_default().push(growth);
        }
    }
    grouped
}

/// Ranked second-key values of groups whose first key is `first`.
fn top_for(groups: &[GroupTotal], first: &str) -> Vec<Performer> {
    let mut performers: Vec<Performer> = groups
        .iter()
        .filter(|g| g.key[0] == first)
        .map(|g| Performer {
            name: g.key[1].clone(),
            total_registrations: g.total,
        })
        .collect();
    rank(&mut performers);
    performers.truncate(TOP_PER_CATEGORY);
    performers
}

fn position_of(dimension: Dimension) -> usize {
    GrowthCalculator::DEFAULT_DIMENSIONS
        .iter()
        .position(|d| *d == dimension)
        .unwrap_or(0)
}

/// Computes summary metrics over a (filtered) table.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// `part` as a percentage of `whole`; zero when `whole` is zero.
    pub fn share_pct(part: u64, whole: u64) -> f64 {
        if whole == 0 {
            0.0
        } else {
            part as f64 / whole as f64 * 100.0
        }
    }

    /// Number of distinct months each value of `dimension` appears in.
    fn months_per_value(
        table: &RegistrationTable,
        dimension: Dimension,
    ) -> PolarsResult<HashMap<String, usize>> {
        let mut months: HashMap<String, BTreeSet<YearMonth>> = HashMap::new();
        for (key, period) in period_totals(table, &[dimension])?.into_keys() {
            if let Some(value) = key.into_iter().next() {
                months.entry(value).or_default().insert(period);
            }
        }
        Ok(months.into_iter().map(|(k, v)| (k, v.len())).collect())
    }

    fn average(total: u64, months: usize) -> f64 {
        if months == 0 {
            0.0
        } else {
            total as f64 / months as f64
        }
    }

    /// Totals and shares for every vehicle category, always in 2W, 3W, 4W order.
    pub fn category_summary(table: &RegistrationTable) -> PolarsResult<Vec<CategorySummary>> {
        let grand_total = table.total_registrations()?;
        let totals: HashMap<String, u64> = dimension_totals(table, &[Dimension::Category])?
            .into_iter()
            .filter_map(|g| Some((g.key.into_iter().next()?, g.total)))
            .collect();
        let months = Self::months_per_value(table, Dimension::Category)?;
        let by_manufacturer =
            dimension_totals(table, &[Dimension::Category, Dimension::Manufacturer])?;
        let by_state = dimension_totals(table, &[Dimension::Category, Dimension::State])?;
        let yoy = GrowthCalculator::year_over_year(table, &[Dimension::Category])?;

        let summaries = VehicleCategory::ALL
            .iter()
            .map(|category| {
                let name = category.as_str();
                let total = totals.get(name).copied().unwrap_or(0);
                CategorySummary {
                    category: *category,
                    total_registrations: total,
                    share_pct: Self::share_pct(total, grand_total),
                    avg_monthly_registrations: Self::average(
                        total,
                        months.get(name).copied().unwrap_or(0),
                    ),
                    top_manufacturers: top_for(&by_manufacturer, name),
                    top_states: top_for(&by_state, name),
                    latest_yoy_growth: yoy
                        .iter()
                        .filter(|r| r.key[0] == name)
                        .max_by_key(|r| r.period)
                        .and_then(|r| r.growth_pct),
                }
            })
            .collect();

        Ok(summaries)
    }

    /// Per-manufacturer totals and shares, ranked by total (ties by name).
    pub fn manufacturer_analysis(
        table: &RegistrationTable,
    ) -> PolarsResult<Vec<ManufacturerStats>> {
        let grand_total = table.total_registrations()?;
        let months = Self::months_per_value(table, Dimension::Manufacturer)?;

        let series = GrowthCalculator::DEFAULT_DIMENSIONS;
        let position = position_of(Dimension::Manufacturer);
        let yoy = growth_by(&GrowthCalculator::year_over_year(table, &series)?, position);
        let qoq = growth_by(
            &GrowthCalculator::quarter_over_quarter(table, &series)?,
            position,
        );

        let mut stats: Vec<ManufacturerStats> =
            dimension_totals(table, &[Dimension::Manufacturer])?
                .into_iter()
                .filter_map(|g| {
                    let manufacturer = g.key.into_iter().next()?;
                    Some(ManufacturerStats {
                        total_registrations: g.total,
                        share_pct: Self::share_pct(g.total, grand_total),
                        avg_monthly_registrations: Self::average(
                            g.total,
                            months.get(&manufacturer).copied().unwrap_or(0),
                        ),
                        data_points: g.rows,
                        avg_yoy_growth: mean_of(yoy.get(&manufacturer)),
                        avg_qoq_growth: mean_of(qoq.get(&manufacturer)),
                        manufacturer,
                    })
                })
                .collect();

        rank(&mut stats);
        Ok(stats)
    }

    /// Top `top_n` states by total with their mean YoY growth.
    pub fn state_analysis(
        table: &RegistrationTable,
        top_n: usize,
    ) -> PolarsResult<Vec<StateStats>> {
        let grand_total = table.total_registrations()?;
        let yoy = growth_by(
            &GrowthCalculator::year_over_year(table, &GrowthCalculator::DEFAULT_DIMENSIONS)?,
            position_of(Dimension::State),
        );

        let mut stats: Vec<StateStats> = dimension_totals(table, &[Dimension::State])?
            .into_iter()
            .filter_map(|g| {
                let state = g.key.into_iter().next()?;
                Some(StateStats {
                    total_registrations: g.total,
                    share_pct: Self::share_pct(g.total, grand_total),
                    avg_yoy_growth: mean_of(yoy.get(&state)),
                    state,
                })
            })
            .collect();

        rank(&mut stats);
        stats.truncate(top_n);
        Ok(stats)
    }

    /// Top `n` values of any dimension by total.
    pub fn top_performers(
        table: &RegistrationTable,
        dimension: Dimension,
        n: usize,
    ) -> PolarsResult<Vec<Performer>> {
        let mut performers: Vec<Performer> = dimension_totals(table, &[dimension])?
            .into_iter()
            .filter_map(|g| {
                Some(Performer {
                    name: g.key.into_iter().next()?,
                    total_registrations: g.total,
                })
            })
            .collect();
        rank(&mut performers);
        performers.truncate(n);
        Ok(performers)
    }

    pub fn kpis(table: &RegistrationTable) -> PolarsResult<Kpis> {
        let domain = table.domain();
        let latest_period = domain.last_period;

        let latest_month_registrations = match latest_period {
            Some(latest) => period_totals(table, &[])?
                .get(&(Vec::new(), latest))
                .copied()
                .unwrap_or(0),
            None => 0,
        };

        let latest_growth: Vec<f64> =
            GrowthCalculator::year_over_year(table, &GrowthCalculator::DEFAULT_DIMENSIONS)?
                .into_iter()
                .filter(|r| Some(r.period) == latest_period)
                .filter_map(|r| r.growth_pct)
                .collect();

        Ok(Kpis {
            total_registrations: table.total_registrations()?,
            unique_manufacturers: domain.manufacturers.len(),
            unique_states: domain.states.len(),
            latest_period,
            latest_month_registrations,
            avg_yoy_growth: mean_of(Some(&latest_growth)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataProcessor, FilterSpec, RegistrationRecord};

    fn record(
        year: i32,
        month: u32,
        state: &str,
        category: VehicleCategory,
        manufacturer: &str,
        count: u64,
    ) -> RegistrationRecord {
        RegistrationRecord {
            year,
            month,
            month_name: None,
            state: state.to_string(),
            vehicle_category: category,
            vehicle_class: "Any".to_string(),
            manufacturer: manufacturer.to_string(),
            registration_count: count,
        }
    }

    fn table() -> RegistrationTable {
        use VehicleCategory::*;
        RegistrationTable::from_records(&[
            record(2022, 3, "MH", TwoWheeler, "Honda", 100),
            record(2023, 3, "MH", TwoWheeler, "Honda", 150),
            record(2023, 3, "KA", TwoWheeler, "Hero", 250),
            record(2023, 3, "KA", ThreeWheeler, "Bajaj", 50),
            record(2022, 3, "KA", FourWheeler, "Maruti", 200),
            record(2023, 3, "KA", FourWheeler, "Maruti", 150),
            record(2023, 2, "DL", FourWheeler, "Tata", 100),
        ])
        .unwrap()
    }

    #[test]
    fn category_totals_conserve_the_filtered_total() {
        let table = table();
        let summary = MetricsCalculator::category_summary(&table).unwrap();

        let sum: u64 = summary.iter().map(|c| c.total_registrations).sum();
        assert_eq!(sum, table.total_registrations().unwrap());

        let shares: f64 = summary.iter().map(|c| c.share_pct).sum();
        assert!((shares - 100.0).abs() < 1e-9);
    }

    #[test]
    fn category_summary_details() {
        let summary = MetricsCalculator::category_summary(&table()).unwrap();
        let categories: Vec<VehicleCategory> = summary.iter().map(|c| c.category).collect();
        assert_eq!(categories, VehicleCategory::ALL.to_vec());

        let four = &summary[2];
        assert_eq!(four.total_registrations, 450);
        // Three distinct months: 2022-03, 2023-02, 2023-03.
        assert_eq!(four.avg_monthly_registrations, 150.0);
        assert_eq!(four.top_manufacturers[0].name, "Maruti");
        assert_eq!(four.top_manufacturers[0].total_registrations, 350);
        // Latest 4W month is 2023-03: 150 against 200.
        assert_eq!(four.latest_yoy_growth, Some(-25.0));

        let three = &summary[1];
        assert_eq!(three.latest_yoy_growth, None);
    }

    #[test]
    fn empty_selection_yields_zeros_not_errors() {
        let table = table();
        let spec = FilterSpec::default()
            .with_manufacturer("Bajaj")
            .with_state("MH");
        let filtered = DataProcessor::apply_filter(&table, &spec).unwrap();

        let summary = MetricsCalculator::category_summary(&filtered).unwrap();
        assert_eq!(summary.len(), 3);
        assert!(summary.iter().all(|c| c.total_registrations == 0 && c.share_pct == 0.0));
        assert!(MetricsCalculator::manufacturer_analysis(&filtered)
            .unwrap()
            .is_empty());

        let kpis = MetricsCalculator::kpis(&filtered).unwrap();
        assert_eq!(kpis.total_registrations, 0);
        assert_eq!(kpis.latest_period, None);
        assert_eq!(kpis.avg_yoy_growth, None);
    }

    #[test]
    fn manufacturers_rank_by_total_then_name() {
        let stats = MetricsCalculator::manufacturer_analysis(&table()).unwrap();
        let order: Vec<&str> = stats.iter().map(|m| m.manufacturer.as_str()).collect();
        // Hero and Honda tie on 250.
        assert_eq!(order, vec!["Maruti", "Hero", "Honda", "Tata", "Bajaj"]);

        let again = MetricsCalculator::manufacturer_analysis(&table()).unwrap();
        assert_eq!(stats, again);

        let honda = &stats[2];
        assert_eq!(honda.data_points, 2);
        assert_eq!(honda.avg_monthly_registrations, 125.0);
        assert_eq!(honda.avg_yoy_growth, Some(50.0));

        let shares: f64 = stats.iter().map(|m| m.share_pct).sum();
        assert!((shares - 100.0).abs() < 1e-9);
    }

    #[test]
    fn state_analysis_truncates_to_top_n() {
        let states = MetricsCalculator::state_analysis(&table(), 2).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].state, "KA");
        assert_eq!(states[0].total_registrations, 650);
        assert_eq!(states[1].state, "MH");
        assert_eq!(states[1].avg_yoy_growth, Some(50.0));
    }

    #[test]
    fn top_performers_by_any_dimension() {
        let top = MetricsCalculator::top_performers(&table(), Dimension::State, 1).unwrap();
        assert_eq!(
            top,
            vec![Performer {
                name: "KA".to_string(),
                total_registrations: 650
            }]
        );
    }

    #[test]
    fn kpis_use_the_latest_month() {
        let kpis = MetricsCalculator::kpis(&table()).unwrap();
        assert_eq!(kpis.total_registrations, 1000);
        assert_eq!(kpis.unique_manufacturers, 5);
        assert_eq!(kpis.unique_states, 3);
        assert_eq!(kpis.latest_period, YearMonth::new(2023, 3));
        assert_eq!(kpis.latest_month_registrations, 600);
        // Honda +50, Maruti -25.
        assert_eq!(kpis.avg_yoy_growth, Some(12.5));
    }
}
