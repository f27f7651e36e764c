//! Registration Schema Module
//! Column names, the row type and the small calendar/category value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_MONTH_NAME: &str = "month_name";
pub const COL_STATE: &str = "state";
pub const COL_CATEGORY: &str = "vehicle_category";
pub const COL_CLASS: &str = "vehicle_class";
pub const COL_MANUFACTURER: &str = "manufacturer";
pub const COL_COUNT: &str = "registration_count";

/// Columns every input file must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_YEAR,
    COL_MONTH,
    COL_STATE,
    COL_CATEGORY,
    COL_CLASS,
    COL_MANUFACTURER,
    COL_COUNT,
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown vehicle category '{0}' (expected 2W, 3W or 4W)")]
    Category(String),
    #[error("Invalid month '{0}' (expected YYYY-MM)")]
    Month(String),
}

/// Coarse vehicle classification used as the primary grouping dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleCategory {
    #[serde(rename = "2W")]
    TwoWheeler,
    #[serde(rename = "3W")]
    ThreeWheeler,
    #[serde(rename = "4W")]
    FourWheeler,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 3] = [
        VehicleCategory::TwoWheeler,
        VehicleCategory::ThreeWheeler,
        VehicleCategory::FourWheeler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::TwoWheeler => "2W",
            VehicleCategory::ThreeWheeler => "3W",
            VehicleCategory::FourWheeler => "4W",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2W" => Ok(VehicleCategory::TwoWheeler),
            "3W" => Ok(VehicleCategory::ThreeWheeler),
            "4W" => Ok(VehicleCategory::FourWheeler),
            _ => Err(ParseError::Category(s.to_string())),
        }
    }
}

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is in 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Absolute month number, consecutive across year boundaries.
    pub fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    pub fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// ceil(month / 3)
    pub fn quarter(&self) -> YearQuarter {
        YearQuarter {
            year: self.year,
            quarter: (self.month + 2) / 3,
        }
    }

    pub fn prior_year(&self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::Month(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year = year.parse::<i32>().map_err(|_| err())?;
        let month = month.parse::<u32>().map_err(|_| err())?;
        YearMonth::new(year, month).ok_or_else(err)
    }
}

/// A calendar quarter (1..=4). Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: u32,
}

impl YearQuarter {
    /// The immediately preceding quarter; Q1 rolls back to Q4 of the prior year.
    pub fn prior(&self) -> Self {
        if self.quarter == 1 {
            Self {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-Q{}", self.year, self.quarter)
    }
}

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub year: i32,
    pub month: u32,
    /// Display only; never used in computations.
    pub month_name: Option<String>,
    pub state: String,
    pub vehicle_category: VehicleCategory,
    pub vehicle_class: String,
    pub manufacturer: String,
    pub registration_count: u64,
}

impl RegistrationRecord {
    pub fn period(&self) -> YearMonth {
        YearMonth {
            year: self.year,
            month: self.month,
        }
    }
}

/// Non-time grouping dimensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    State,
    Category,
    Class,
    Manufacturer,
}

impl Dimension {
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::State => COL_STATE,
            Dimension::Category => COL_CATEGORY,
            Dimension::Class => COL_CLASS,
            Dimension::Manufacturer => COL_MANUFACTURER,
        }
    }

    pub fn columns(dims: &[Dimension]) -> Vec<&'static str> {
        dims.iter().map(Dimension::column).collect()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_is_ceil_of_month_over_three() {
        let quarters: Vec<u32> = (1..=12)
            .map(|m| YearMonth::new(2023, m).unwrap().quarter().quarter)
            .collect();
        assert_eq!(quarters, vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4]);
    }

    #[test]
    fn first_quarter_rolls_back_a_year() {
        let q1 = YearQuarter { year: 2023, quarter: 1 };
        assert_eq!(q1.prior(), YearQuarter { year: 2022, quarter: 4 });
        assert_eq!(q1.prior().prior(), YearQuarter { year: 2022, quarter: 3 });
    }

    #[test]
    fn month_index_round_trips_across_years() {
        let jan = YearMonth::new(2024, 1).unwrap();
        let dec = YearMonth::from_index(jan.index() - 1);
        assert_eq!(dec, YearMonth::new(2023, 12).unwrap());
        assert_eq!(YearMonth::from_index(dec.index()), dec);
    }

    #[test]
    fn parses_year_month_and_rejects_bad_months() {
        assert_eq!("2023-03".parse::<YearMonth>(), Ok(YearMonth { year: 2023, month: 3 }));
        assert!("2023-13".parse::<YearMonth>().is_err());
        assert!("March 2023".parse::<YearMonth>().is_err());
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(" 2w ".parse::<VehicleCategory>(), Ok(VehicleCategory::TwoWheeler));
        assert_eq!(
            "5W".parse::<VehicleCategory>(),
            Err(ParseError::Category("5W".to_string()))
        );
    }
}
