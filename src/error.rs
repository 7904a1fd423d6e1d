use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

/// Failures that abort a report run. Per-batch carrier failures and
/// unparseable dates are recovered locally and never show up here.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The carrier rejected the credential exchange.
    #[error("carrier authentication failed: {0}")]
    AuthenticationFailure(String),

    /// Nothing in the input survived tracking-number filtering.
    #[error("no valid tracking numbers found in input")]
    NoValidTrackingNumbers,

    #[error("unsupported file type: {0} (expected .xlsx or .xls)")]
    UnsupportedFile(String),

    #[error("invalid input workbook: {0}")]
    InvalidWorkbook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),

    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),
}

impl ReportError {
    /// True for errors caused by what the caller sent rather than by us or
    /// the carrier.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            ReportError::NoValidTrackingNumbers
                | ReportError::UnsupportedFile(_)
                | ReportError::InvalidWorkbook(_)
                | ReportError::ExcelRead(_)
        )
    }
}
