use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::shipment::{ClassifiedRecord, Lifecycle};

pub const SHEET_NAME: &str = "FedEx Tracking Report";

pub const HEADERS: [&str; 12] = [
    "Client",
    "Tracking",
    "Status",
    "Label Date",
    "Ship Date",
    "Days After Ship",
    "Working Days",
    "Days After Label",
    "Origin City",
    "Origin State",
    "Origin Country",
    "Narrative",
];

const COLUMN_WIDTHS: [f64; 12] = [
    18.0, 16.0, 16.0, 12.0, 12.0, 14.0, 14.0, 20.0, 12.0, 10.0, 10.0, 40.0,
];

const HEADER_FILL: u32 = 0x4472C4;
const HEADER_FONT: u32 = 0xFFFFFF;

/// Row fill for a lifecycle category. `Unknown` rows stay unfilled.
pub fn category_fill(category: Lifecycle) -> Option<u32> {
    match category {
        Lifecycle::Delivered => Some(0xC6EFCE),
        Lifecycle::LabelCreated => Some(0xFFEB9C),
        Lifecycle::Exception => Some(0xFFC7CE),
        Lifecycle::InTransit => Some(0xBDD7EE),
        Lifecycle::Unknown => None,
    }
}

enum Cell<'a> {
    Text(&'a str),
    Owned(String),
    Number(i64),
}

fn format_date(date: Option<NaiveDateTime>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn row_cells(record: &ClassifiedRecord) -> [Cell<'_>; 12] {
    let label_column = match record.category {
        Lifecycle::Delivered => Cell::Text(&record.label_text),
        _ => Cell::Number(record.label_age),
    };

    [
        Cell::Text(&record.client),
        Cell::Text(&record.tracking_number),
        Cell::Text(&record.status),
        Cell::Owned(format_date(record.label_date)),
        Cell::Owned(format_date(record.ship_date)),
        Cell::Number(record.days_since_ship),
        Cell::Number(record.working_days),
        label_column,
        Cell::Text(&record.origin.city),
        Cell::Text(&record.origin.state),
        Cell::Text(&record.origin.country),
        Cell::Text(&record.narrative),
    ]
}

/// Build the styled report workbook: bold header on a blue band, one bordered
/// and centred row per record filled by its category, fixed column widths,
/// frozen header row.
pub fn render(records: &[ClassifiedRecord]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_size(11)
        .set_font_color(HEADER_FONT)
        .set_background_color(HEADER_FILL)
        .set_align(FormatAlign::Center)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);

    let base = Format::new()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        let format = match category_fill(record.category) {
            Some(fill) => base.clone().set_background_color(fill),
            None => base.clone(),
        };

        for (col, cell) in row_cells(record).iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string_with_format(row, col, *value, &format)?;
                }
                Cell::Owned(value) => {
                    worksheet.write_string_with_format(row, col, value, &format)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number_with_format(row, col, *value as f64, &format)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;

    Ok(workbook)
}

/// Storage name for a report generated at `now`. The random suffix keeps
/// concurrent runs from ever sharing a file.
pub fn report_file_name(now: NaiveDateTime) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "FedEx_Report_{}_{}.xlsx",
        now.format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

/// Render the report straight into memory, for callers that hand the bytes
/// on and keep no file.
pub fn report_bytes(records: &[ClassifiedRecord]) -> Result<Vec<u8>> {
    let mut workbook = render(records)?;
    let bytes = workbook.save_to_buffer()?;

    info!(rows = records.len(), size = bytes.len(), "Report rendered");

    Ok(bytes)
}

/// Render the report and save it under a unique name in `dir`.
pub fn write_report(records: &[ClassifiedRecord], dir: &Path, now: NaiveDateTime) -> Result<PathBuf> {
    let mut workbook = render(records)?;
    let path = dir.join(report_file_name(now));
    workbook.save(&path)?;

    info!(path = %path.display(), rows = records.len(), "Report written");

    Ok(path)
}
