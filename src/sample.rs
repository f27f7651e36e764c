//! Sample Data Module
//! Deterministic synthetic registrations in the loader's schema, used for
//! demos and as the offline fallback when a live source is down.

use crate::data::{RegistrationRecord, RegistrationTable, VehicleCategory, YearMonth};
use polars::prelude::PolarsResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const TWO_WHEELER_CLASSES: &[&str] = &["M-CYCLE/SCOOTER", "MOPED", "MOTORISED CYCLE (CC > 25CC)"];
const THREE_WHEELER_CLASSES: &[&str] = &[
    "THREE WHEELER (GOODS)",
    "THREE WHEELER (PASSENGER)",
    "THREE WHEELER (PERSONAL)",
    "E-RICKSHAW(P)",
];
const FOUR_WHEELER_CLASSES: &[&str] = &[
    "MOTOR CAR",
    "OMNI BUS",
    "BUS",
    "GOODS CARRIER",
    "LUXURY CAB",
    "MOTOR CAB",
];

const TWO_WHEELER_MAKERS: &[&str] = &[
    "HERO MOTOCORP LTD",
    "HONDA MOTORCYCLE & SCOOTER INDIA",
    "TVS MOTOR COMPANY LTD",
    "BAJAJ AUTO LIMITED",
    "ROYAL ENFIELD",
    "YAMAHA MOTOR INDIA",
    "SUZUKI MOTORCYCLE",
];
const THREE_WHEELER_MAKERS: &[&str] = &[
    "BAJAJ AUTO LIMITED",
    "TVS MOTOR COMPANY LTD",
    "MAHINDRA & MAHINDRA",
    "PIAGGIO VEHICLES PVT LTD",
    "ATUL AUTO LIMITED",
];
const FOUR_WHEELER_MAKERS: &[&str] = &[
    "MARUTI SUZUKI INDIA LTD",
    "HYUNDAI MOTOR INDIA LTD",
    "TATA MOTORS LTD",
    "MAHINDRA & MAHINDRA",
    "TOYOTA KIRLOSKAR MOTOR",
    "KIA MOTORS INDIA",
    "HONDA CARS INDIA LTD",
    "MG MOTOR INDIA",
];

pub const STATES: &[&str] = &[
    "Andhra Pradesh",
    "Bihar",
    "Chhattisgarh",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Karnataka",
    "Kerala",
    "Maharashtra",
    "Madhya Pradesh",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Tamil Nadu",
    "Uttar Pradesh",
    "West Bengal",
];

const MARKET_LEADERS: &[&str] = &["HERO MOTOCORP LTD", "MARUTI SUZUKI INDIA LTD"];
const STRONG_PLAYERS: &[&str] = &[
    "HONDA MOTORCYCLE & SCOOTER INDIA",
    "HYUNDAI MOTOR INDIA LTD",
    "TATA MOTORS LTD",
];

fn classes(category: VehicleCategory) -> &'static [&'static str] {
    match category {
        VehicleCategory::TwoWheeler => TWO_WHEELER_CLASSES,
        VehicleCategory::ThreeWheeler => THREE_WHEELER_CLASSES,
        VehicleCategory::FourWheeler => FOUR_WHEELER_CLASSES,
    }
}

fn manufacturers(category: VehicleCategory) -> &'static [&'static str] {
    match category {
        VehicleCategory::TwoWheeler => TWO_WHEELER_MAKERS,
        VehicleCategory::ThreeWheeler => THREE_WHEELER_MAKERS,
        VehicleCategory::FourWheeler => FOUR_WHEELER_MAKERS,
    }
}

fn base_range(category: VehicleCategory) -> (f64, f64) {
    match category {
        VehicleCategory::TwoWheeler => (5000.0, 25000.0),
        VehicleCategory::ThreeWheeler => (500.0, 3000.0),
        VehicleCategory::FourWheeler => (1000.0, 8000.0),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGenerator {
    pub start_year: i32,
    pub end_year: i32,
    pub seed: u64,
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self {
            start_year: 2020,
            end_year: 2024,
            seed: 42,
        }
    }
}

impl SampleGenerator {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Every month × state × class × manufacturer combination in range.
    pub fn records(&self) -> Vec<RegistrationRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rows = Vec::new();
        for year in self.start_year..=self.end_year {
            for month in 1..=12 {
                let Some(period) = YearMonth::new(year, month) else {
                    continue;
                };
                for state in STATES {
                    for category in VehicleCategory::ALL {
                        for class in classes(category) {
                            for manufacturer in manufacturers(category) {
                                let registration_count =
                                    count(&mut rng, period, category, class, manufacturer);
                                rows.push(RegistrationRecord {
                                    year,
                                    month,
                                    month_name: Some(period.month_name().to_string()),
                                    state: state.to_string(),
                                    vehicle_category: category,
                                    vehicle_class: class.to_string(),
                                    manufacturer: manufacturer.to_string(),
                                    registration_count,
                                });
                            }
                        }
                    }
                }
            }
        }
        info!(
            rows = rows.len(),
            start_year = self.start_year,
            end_year = self.end_year,
            "Generated sample registrations"
        );
        rows
    }

    pub fn table(&self) -> PolarsResult<RegistrationTable> {
        RegistrationTable::from_records(&self.records())
    }
}

fn count(
    rng: &mut StdRng,
    period: YearMonth,
    category: VehicleCategory,
    class: &str,
    manufacturer: &str,
) -> u64 {
    let YearMonth { year, month } = period;

    let (low, high) = base_range(category);
    let mut base = rng.gen_range(low..high).floor();
    if MARKET_LEADERS.contains(&manufacturer) {
        base *= rng.gen_range(1.5..2.5);
    } else if STRONG_PLAYERS.contains(&manufacturer) {
        base *= rng.gen_range(1.2..1.8);
    }

    let mut seasonal = match month {
        3 | 4 | 10 | 11 => rng.gen_range(1.2..1.4),
        6..=8 => rng.gen_range(0.7..0.9),
        _ => 1.0,
    };

    // Pandemic slump
    if year == 2020 && month >= 4 {
        seasonal *= rng.gen_range(0.3..0.6);
    } else if year == 2021 {
        seasonal *= rng.gen_range(0.6..0.9);
    }

    let growth = if class.starts_with("E-") || manufacturer.contains("ELECTRIC") {
        1.0 + f64::from(year - 2020).max(0.0) * 0.3
    } else {
        1.0
    };

    ((base * seasonal * growth) as u64).max(1)
}
