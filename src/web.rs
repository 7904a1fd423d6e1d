use crate::config::Config;
use crate::courier::CourierClient;
use crate::error::ReportError;
use crate::report;
use crate::sheet::read::check_extension;
use anyhow::Context;
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::Local;
use serde_json::{Value, json};
use std::io::Write;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "FedEx Tracking Report";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DOWNLOAD_DISPOSITION: &str = "attachment; filename=\"FedEx_Tracking_Report.xlsx\"";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    courier: Arc<dyn CourierClient>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        let status = match &err {
            ReportError::AuthenticationFailure(_) => StatusCode::UNAUTHORIZED,
            err if err.is_bad_request() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.body_text()))?;
        return Ok((file_name, bytes));
    }

    Err(ApiError::new(
        StatusCode::BAD_REQUEST,
        "multipart field 'file' is required",
    ))
}

/// Store the upload in a temporary file, run the report, and return its
/// bytes. The temporary input is removed when this returns, success or not,
/// and the report itself never touches the disk.
fn run_upload(
    courier: &dyn CourierClient,
    config: &Config,
    file_name: &str,
    bytes: &[u8],
) -> Result<Vec<u8>, ReportError> {
    check_extension(file_name)?;

    let suffix = if file_name.to_lowercase().ends_with(".xls") {
        ".xls"
    } else {
        ".xlsx"
    };
    let mut input = tempfile::Builder::new()
        .prefix("input_")
        .suffix(suffix)
        .tempfile()?;
    input.write_all(bytes)?;
    input.flush()?;

    let now = Local::now().naive_local();
    report::render_from_workbook(courier, input.path(), config, now)
}

async fn track(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart).await?;
    check_extension(&file_name)?;

    info!(file_name = %file_name, size = bytes.len(), "Tracking upload received");

    let AppState { config, courier } = state;
    let body = tokio::task::spawn_blocking(move || {
        run_upload(courier.as_ref(), &config, &file_name, &bytes)
    })
    .await
    .map_err(|err| {
        error!(error = %err, "Report worker failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "report generation failed")
    })?
    .inspect_err(|err| warn!(error = %err, "Report request rejected"))?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME),
            (header::CONTENT_DISPOSITION, DOWNLOAD_DISPOSITION),
        ],
        body,
    )
        .into_response())
}

fn router(config: Arc<Config>, courier: Arc<dyn CourierClient>) -> Router {
    let body_limit = config.web.max_upload_bytes;
    Router::new()
        .route("/api/track", post(track))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { config, courier })
}

/// Serve the report API until `running` is cleared.
pub fn start(
    config: Config,
    courier: Arc<dyn CourierClient>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let port = config.web.port;
    let app = router(Arc::new(config), courier);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime for web server")?;

    rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("Web server failed to bind port {port}"))?;

        info!(port, "Web server listening");

        let shutdown = async move {
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
            info!("Web server shutting down");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Web server error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::StubCourier;
    use rust_xlsxwriter::Workbook;

    fn input_workbook(rows: &[(&str, &str)]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Client").unwrap();
        sheet.write_string(0, 1, "Tracking").unwrap();
        for (i, (client, tracking)) in rows.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, *client).unwrap();
            sheet.write_string(row, 1, *tracking).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.report.output_dir = dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn error_statuses() {
        let status = |err: ReportError| ApiError::from(err).status;

        assert_eq!(
            status(ReportError::AuthenticationFailure("denied".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status(ReportError::NoValidTrackingNumbers), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ReportError::UnsupportedFile("a.csv".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ReportError::Io(std::io::Error::other("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upload_produces_report_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let courier = StubCourier::default();
        let bytes = input_workbook(&[("Acme", "1234567890")]);

        let report = run_upload(&courier, &config_in(dir.path()), "shipments.xlsx", &bytes).unwrap();

        // xlsx files are zip archives.
        assert_eq!(&report[..2], b"PK");
        assert_eq!(courier.batch_calls(), vec![vec!["1234567890".to_string()]]);
    }

    #[test]
    fn uploads_leave_nothing_in_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let courier = StubCourier::default();
        let bytes = input_workbook(&[("Acme", "1234567890")]);
        let config = config_in(dir.path());

        for _ in 0..3 {
            run_upload(&courier, &config, "shipments.xlsx", &bytes).unwrap();
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn upload_with_wrong_extension_is_rejected_before_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let courier = StubCourier::default();

        let result = run_upload(&courier, &config_in(dir.path()), "shipments.csv", b"a,b");

        assert!(matches!(result, Err(ReportError::UnsupportedFile(_))));
        assert_eq!(*courier.auth_calls.lock().unwrap(), 0);
    }

    #[test]
    fn upload_without_tracking_numbers_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let courier = StubCourier::default();
        let bytes = input_workbook(&[("Acme", "n/a")]);

        let result = run_upload(&courier, &config_in(dir.path()), "shipments.xlsx", &bytes);

        assert!(matches!(result, Err(ReportError::NoValidTrackingNumbers)));
        assert!(courier.batch_calls().is_empty());
    }
}
