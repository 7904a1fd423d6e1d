use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use tracing::{debug, info};

use crate::config::InputConfig;
use crate::error::{ReportError, Result};
use crate::extractors::extract_queries;
use crate::shipment::TrackingQuery;

const ACCEPTED_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// Reject anything that is not an Excel workbook by name.
pub fn check_extension(file_name: &str) -> Result<()> {
    let lower = file_name.to_lowercase();
    if ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Ok(())
    } else {
        Err(ReportError::UnsupportedFile(file_name.to_string()))
    }
}

/// Read tracking queries from the first worksheet of an uploaded workbook.
///
/// The first row is a header. The tracking column is `layout.tracking_column`
/// when the sheet is wide enough, else the last column; the client column is
/// `layout.client_column` when wide enough, else the first.
pub fn read_queries(path: &Path, layout: &InputConfig) -> Result<Vec<TrackingQuery>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::InvalidWorkbook("workbook has no worksheets".into()))??;

    let rows = cell_pairs(&range, layout)?;
    let total = rows.len();
    let queries = extract_queries(rows, layout.min_tracking_length);

    info!(
        rows = total,
        accepted = queries.len(),
        "Input workbook read"
    );

    Ok(queries)
}

fn cell_pairs(range: &Range<DataType>, layout: &InputConfig) -> Result<Vec<(String, String)>> {
    let (Some((first_row, _)), Some((last_row, last_col))) = (range.start(), range.end()) else {
        return Err(ReportError::InvalidWorkbook("worksheet is empty".into()));
    };

    // Columns are counted from A, so leading blank columns still count.
    let columns = last_col as usize + 1;
    let tracking_col = if columns > layout.tracking_column {
        layout.tracking_column
    } else {
        columns - 1
    };
    let client_col = if columns > layout.client_column {
        layout.client_column
    } else {
        0
    };

    debug!(columns, tracking_col, client_col, "Resolved input columns");

    let pairs = (first_row + 1..=last_row)
        .map(|row| {
            (
                cell_to_string(range.get_value((row, tracking_col as u32))),
                cell_to_string(range.get_value((row, client_col as u32))),
            )
        })
        .collect();

    Ok(pairs)
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        // Display drops the fraction of whole floats, so 123456789012.0
        // comes out as the digits alone.
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_input(path: &Path, rows: &[Vec<&str>]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn extension_check() {
        assert!(check_extension("shipments.xlsx").is_ok());
        assert!(check_extension("LEGACY.XLS").is_ok());
        assert!(matches!(
            check_extension("shipments.csv"),
            Err(ReportError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn narrow_sheet_uses_first_and_last_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");
        write_input(
            &path,
            &[
                vec!["Client", "Tracking"],
                vec!["Acme", "1234 5678 9012"],
                vec!["Globex", "abc"],
                vec!["Initech", "987654321098"],
            ],
        );

        let queries = read_queries(&path, &InputConfig::default()).unwrap();

        assert_eq!(
            queries,
            vec![
                TrackingQuery {
                    tracking_number: "123456789012".into(),
                    client: "Acme".into(),
                },
                TrackingQuery {
                    tracking_number: "987654321098".into(),
                    client: "Initech".into(),
                },
            ]
        );
    }

    #[test]
    fn wide_sheet_uses_configured_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut header = vec!["h"; 16];
        header[2] = "Client";
        header[14] = "Tracking";
        let mut row = vec![""; 16];
        row[2] = "Acme";
        row[14] = "1234567890";
        row[15] = "9999999999";
        write_input(&path, &[header, row]);

        let queries = read_queries(&path, &InputConfig::default()).unwrap();

        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].tracking_number, "1234567890");
        assert_eq!(queries[0].client, "Acme");
    }

    #[test]
    fn numeric_tracking_cells_are_read_as_digits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Client").unwrap();
        sheet.write_string(0, 1, "Tracking").unwrap();
        sheet.write_string(1, 0, "Acme").unwrap();
        sheet.write_number(1, 1, 123456789012.0).unwrap();
        workbook.save(&path).unwrap();

        let queries = read_queries(&path, &InputConfig::default()).unwrap();

        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].tracking_number, "123456789012");
    }

    #[test]
    fn empty_sheet_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        workbook.save(&path).unwrap();

        let result = read_queries(&path, &InputConfig::default());

        assert!(matches!(result, Err(ReportError::InvalidWorkbook(_))));
    }
}
