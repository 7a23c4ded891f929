use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use handlebars::Handlebars;
use lazy_static::lazy_static;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

use crate::downloader::{self, ExportFormat, ExportSettings};
use crate::error::{PyramidError, Result};
use crate::graph::create_pyramid_chart;
use crate::loader::{self, SUPPORTED_EXTENSIONS};
use crate::options::RenderConfig;
use crate::pyramid::PyramidData;
use crate::table::TablePreview;

/// Address the server listens on when none is given.
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Largest accepted upload, multipart overhead included.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Rows of the uploaded table echoed back for the preview.
pub const PREVIEW_ROWS: usize = 5;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const TEMPLATE_FILE_NAME: &str = "pyramid_template.xlsx";

lazy_static! {
    static ref TEMPLATES: Handlebars<'static> = {
        let mut registry = Handlebars::new();
        registry
            .register_template_string("index", include_str!("./static/index.html"))
            .expect("form page template must parse");
        registry
    };
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
    /// Top of the uploaded table when it loaded but could not be charted
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<TablePreview>,
}

/// A failed request, carrying the data preview when the file itself loaded.
struct AppError {
    error: PyramidError,
    preview: Option<TablePreview>,
}

impl From<PyramidError> for AppError {
    fn from(error: PyramidError) -> Self {
        AppError {
            error,
            preview: None,
        }
    }
}

type ApiResult<T> = std::result::Result<T, AppError>;

/// Export figures shown under the chart.
#[derive(Serialize)]
struct ExportSummary {
    width: u32,
    height: u32,
    png_scale: f64,
    png_width: u32,
    png_height: u32,
}

impl From<&ExportSettings> for ExportSummary {
    fn from(settings: &ExportSettings) -> Self {
        let (width, height) = settings.pixel_size();
        let (png_width, png_height) = settings.png_size();
        ExportSummary {
            width,
            height,
            png_scale: settings.png_scale(),
            png_width,
            png_height,
        }
    }
}

#[derive(Serialize)]
struct RenderResponse {
    status: String,
    preview: TablePreview,
    svg: String,
    export: ExportSummary,
}

/// The uploaded spreadsheet plus the form state it came with.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    config: RenderConfig,
}

/// Result of running one upload through load, validation and rendering.
struct Rendered {
    preview: TablePreview,
    svg: String,
    config: RenderConfig,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.error.is_user_error() {
            log::warn!("rejected request: {}", self.error);
            StatusCode::BAD_REQUEST
        } else {
            log::error!("request failed: {}", self.error);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = StatusResponse {
            status: "error".to_string(),
            message: Some(self.error.to_string()),
            preview: self.preview,
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router
///
/// Kept separate from [`run`] so tests can drive it without a socket.
pub fn router() -> Router {
    Router::new()
        .route("/", get(serve_form))
        .route("/api/defaults", get(get_defaults))
        .route("/api/template", get(download_template))
        .route("/api/render", post(render_chart))
        .route("/api/export/:format", post(export_chart))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
}

pub async fn run(addr: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let app = router();

    // Start server
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_form() -> ApiResult<Html<String>> {
    let accept = SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    let page = TEMPLATES
        .render(
            "index",
            &serde_json::json!({
                "options": RenderConfig::default(),
                "accept": accept,
            }),
        )
        .map_err(|e| PyramidError::Render(format!("form page: {}", e)))?;

    Ok(Html(page))
}

async fn get_defaults() -> Json<RenderConfig> {
    Json(RenderConfig::default())
}

async fn download_template() -> ApiResult<Response> {
    let bytes = downloader::sample_workbook()?;
    log::info!("serving sample workbook ({} bytes)", bytes.len());

    let headers = [
        (header::CONTENT_TYPE, XLSX_MIME.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(TEMPLATE_FILE_NAME),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn render_chart(multipart: Multipart) -> ApiResult<Json<RenderResponse>> {
    let upload = read_upload(multipart).await?;
    log::info!(
        "render request for '{}' ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let rendered = blocking(move || render_upload(&upload)).await?;

    Ok(Json(RenderResponse {
        status: "ok".to_string(),
        export: ExportSummary::from(&rendered.config.export),
        preview: rendered.preview,
        svg: rendered.svg,
    }))
}

async fn export_chart(Path(format): Path<String>, multipart: Multipart) -> ApiResult<Response> {
    let format: ExportFormat = format.parse()?;
    let upload = read_upload(multipart).await?;
    log::info!(
        "{} export request for '{}' ({} bytes)",
        format.extension(),
        upload.file_name,
        upload.bytes.len()
    );

    let file = blocking(move || {
        let rendered = render_upload(&upload)?;
        Ok(downloader::export_chart(
            &rendered.svg,
            &rendered.config.chart.title,
            &rendered.config.export,
            format,
        )?)
    })
    .await?;

    let headers = [
        (header::CONTENT_TYPE, file.mime.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&file.file_name),
        ),
    ];
    Ok((headers, file.bytes).into_response())
}

/// Collect the `file` and `config` fields of a form submission.
async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut file = None;
    let mut config_json = String::new();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                file = Some((file_name, bytes.to_vec()));
            }
            "config" => {
                config_json = field.text().await.map_err(malformed)?;
            }
            other => log::debug!("ignoring form field '{}'", other),
        }
    }

    let (file_name, bytes) = match file {
        Some((name, bytes)) if !bytes.is_empty() => (name, bytes),
        _ => return Err(PyramidError::Load("No file data received".to_string())),
    };

    Ok(Upload {
        file_name,
        bytes,
        config: RenderConfig::from_json(&config_json)?,
    })
}

fn malformed(e: axum::extract::multipart::MultipartError) -> PyramidError {
    PyramidError::Load(format!("Malformed upload: {}", e))
}

/// Load, check and draw one upload at the base export size.
///
/// Once the file has loaded, data errors carry the preview so the page can
/// show the real headers next to the message.
fn render_upload(upload: &Upload) -> ApiResult<Rendered> {
    let config = upload.config.clone();
    config.validate()?;

    let table = loader::load_table(&upload.file_name, &upload.bytes)?;
    let preview = table.head(PREVIEW_ROWS);

    let data = match PyramidData::from_table(&table, &config.chart.columns) {
        Ok(data) => data,
        Err(error) => {
            return Err(AppError {
                error,
                preview: Some(preview),
            });
        }
    };
    let svg = create_pyramid_chart(&data, &config.chart, config.export.pixel_size())?;

    Ok(Rendered {
        preview,
        svg,
        config,
    })
}

// Chart drawing and rasterizing are CPU-bound; keep them off the async workers.
async fn blocking<T, F>(job: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| PyramidError::Render(format!("worker task failed: {}", e)))?
}

/// `attachment` header value carrying both an ASCII fallback name and the
/// exact UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
