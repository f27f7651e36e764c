//! Data module - CSV loading, schema and filtering

mod loader;
mod processor;
pub mod schema;
mod table;

pub use loader::{
    load_from_source, parse_csv, DataLoader, LoadOptions, LoadReport, LoaderError, RejectedRow,
};
pub use processor::{DataProcessor, FilterError, FilterSpec};
pub use schema::{
    Dimension, RegistrationRecord, VehicleCategory, YearMonth, YearQuarter, REQUIRED_COLUMNS,
};
pub use table::{RegistrationTable, TableDomain};

pub(crate) use table::{int_values, string_values, uint_values};
