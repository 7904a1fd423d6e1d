use crate::aggregate::aggregate;
use crate::config::Config;
use crate::courier::CourierClient;
use crate::error::Result;
use crate::sheet::{read, write};
use crate::shipment::TrackingQuery;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Track the given queries and write the styled report. Returns the path of
/// the uniquely named artifact.
pub fn generate(
    courier: &dyn CourierClient,
    queries: &[TrackingQuery],
    config: &Config,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let records = aggregate(courier, queries, &config.report, now)?;
    write::write_report(&records, Path::new(&config.report.output_dir), now)
}

/// Read an input workbook, track everything in it, and write the report.
pub fn generate_from_workbook(
    courier: &dyn CourierClient,
    input: &Path,
    config: &Config,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let queries = read::read_queries(input, &config.input)?;
    generate(courier, &queries, config, now)
}

/// Read an input workbook, track everything in it, and return the rendered
/// report without writing it to disk.
pub fn render_from_workbook(
    courier: &dyn CourierClient,
    input: &Path,
    config: &Config,
    now: NaiveDateTime,
) -> Result<Vec<u8>> {
    let queries = read::read_queries(input, &config.input)?;
    let records = aggregate(courier, &queries, &config.report, now)?;
    write::report_bytes(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{StubCourier, now};
    use crate::error::ReportError;
    use calamine::{DataType, Reader, open_workbook_auto};
    use rust_xlsxwriter::Workbook;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.report.output_dir = dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn delivered_shipment_becomes_one_green_row() {
        let dir = tempfile::tempdir().unwrap();
        let courier = StubCourier::default();
        let queries = vec![TrackingQuery {
            tracking_number: "1234567890".into(),
            client: "Acme".into(),
        }];

        let path = generate(&courier, &queries, &config_in(dir.path()), now()).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let rows: Vec<&[DataType]> = range.rows().collect();

        assert_eq!(rows.len(), 2);
        let row = rows[1];
        assert_eq!(row[0], DataType::String("Acme".into()));
        assert_eq!(row[1], DataType::String("1234567890".into()));
        assert_eq!(row[2], DataType::String("Delivered".into()));
        assert_eq!(row[3], DataType::String("2024-01-01".into()));
        assert_eq!(row[4], DataType::String("2024-01-01".into()));
        assert_eq!(row[5], DataType::Float(7.0));
        assert_eq!(row[6], DataType::Float(5.0));
        assert!(row[11].to_string().contains('7'));
    }

    #[test]
    fn workbook_without_tracking_numbers_never_calls_carrier() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Client").unwrap();
        sheet.write_string(0, 1, "Tracking").unwrap();
        sheet.write_string(1, 0, "Acme").unwrap();
        sheet.write_string(1, 1, "pending").unwrap();
        workbook.save(&input).unwrap();

        let courier = StubCourier::default();
        let result = generate_from_workbook(&courier, &input, &config_in(dir.path()), now());

        assert!(matches!(result, Err(ReportError::NoValidTrackingNumbers)));
        assert_eq!(*courier.auth_calls.lock().unwrap(), 0);
        assert!(courier.batch_calls().is_empty());
    }
}
