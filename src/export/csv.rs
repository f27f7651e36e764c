//! CSV export via the Polars writer.

use super::ExportError;
use polars::prelude::*;
use std::io::Write;

/// Write `df` with a header row.
pub fn write_csv<W: Write>(df: &DataFrame, writer: W) -> Result<(), ExportError> {
    let mut df = df.clone();
    CsvWriter::new(writer).include_header(true).finish(&mut df)?;
    Ok(())
}

pub fn csv_bytes(df: &DataFrame) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_csv(df, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        parse_csv, DataProcessor, FilterSpec, LoadOptions, RegistrationRecord, RegistrationTable,
        VehicleCategory, YearMonth,
    };

    fn records() -> Vec<RegistrationRecord> {
        let mut rows = Vec::new();
        for (year, month, state, count) in [
            (2022, 3, "Maharashtra", 100),
            (2023, 3, "Maharashtra", 150),
            (2023, 4, "Tamil Nadu", 80),
            (2023, 5, "Tamil Nadu", 0),
        ] {
            rows.push(RegistrationRecord {
                year,
                month,
                month_name: YearMonth::new(year, month).map(|p| p.month_name().to_string()),
                state: state.to_string(),
                vehicle_category: VehicleCategory::TwoWheeler,
                vehicle_class: "M-CYCLE/SCOOTER".to_string(),
                manufacturer: "HONDA MOTORCYCLE & SCOOTER INDIA".to_string(),
                registration_count: count,
            });
        }
        rows
    }

    #[test]
    fn header_matches_table_columns() {
        let table = RegistrationTable::from_records(&records()).unwrap();
        let text = String::from_utf8(csv_bytes(table.dataframe()).unwrap()).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "year,month,month_name,state,vehicle_category,vehicle_class,manufacturer,registration_count"
        );
    }

    #[test]
    fn filtered_export_reloads_identically() {
        let table = RegistrationTable::from_records(&records()).unwrap();
        let spec = FilterSpec::default().with_date_range(
            YearMonth::new(2023, 1).unwrap(),
            YearMonth::new(2023, 12).unwrap(),
        );
        let filtered = DataProcessor::apply_filter(&table, &spec).unwrap();

        let bytes = csv_bytes(filtered.dataframe()).unwrap();
        let (reloaded, report) = parse_csv(&bytes, &LoadOptions::default()).unwrap();

        assert_eq!(report.rows_rejected, 0);
        assert_eq!(reloaded, filtered);
        assert_eq!(reloaded.records().unwrap(), filtered.records().unwrap());
    }

    #[test]
    fn blank_month_names_survive_a_filtered_round_trip() {
        let bytes = b"year,month,month_name,state,vehicle_category,vehicle_class,manufacturer,registration_count\n\
2023,1,January,MH,2W,Scooter,Honda,5\n\
2023,2,,KA,2W,Scooter,Honda,7\n";
        let (table, _) = parse_csv(bytes, &LoadOptions::default()).unwrap();
        let filtered =
            DataProcessor::apply_filter(&table, &FilterSpec::default().with_state("KA")).unwrap();
        assert!(filtered.has_month_name());

        let exported = csv_bytes(filtered.dataframe()).unwrap();
        let (reloaded, _) = parse_csv(&exported, &LoadOptions::default()).unwrap();

        assert!(reloaded.has_month_name());
        assert_eq!(reloaded, filtered);
    }

    #[test]
    fn round_trip_through_a_file() {
        let table = RegistrationTable::from_records(&records()).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(table.dataframe(), file.reopen().unwrap()).unwrap();

        let mut loader = crate::data::DataLoader::default();
        let reloaded = loader.load_csv(file.path()).unwrap();
        assert_eq!(reloaded, &table);
    }
}
