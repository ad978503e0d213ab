use crate::config::Config;
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::TableError;
use crate::extract::{Detection, TableExtraction, TableExtractor};
use crate::grid::{BoundingBox, GridConfig, GridOutcome, GridPipeline};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<TableExtractor>,
    pub config: Arc<Config>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub ocr_enabled: bool,
    pub default_engine: Option<String>,
    pub available_engines: Vec<EngineInfo>,
    pub grid: GridConfig,
    pub threshold: String,
    pub light_text: bool,
    pub denoise: bool,
    pub delimiter: String,
    pub column_names: Option<Vec<String>>,
    pub max_file_size_bytes: usize,
    pub default_language: String,
}

/// Body of `POST /grid`
#[derive(Deserialize)]
pub struct GridRequest {
    pub boxes: Vec<[i32; 4]>,
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Deserialize)]
pub struct TraceParams {
    #[serde(default)]
    pub trace: bool,
}

/// Parts of a multipart page upload
struct Upload {
    data: Bytes,
    file_name: Option<String>,
    config: Option<Value>,
}

/// Build the router over already initialized state
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/grid", post(handle_grid))
        .route("/detect", post(handle_detect))
        .route("/extract", post(handle_extract))
        .route("/extract/:engine", post(handle_extract_with_engine))
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_file_size)),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.export.header(config.page.grid.expected_columns)?;
    let registry = EngineRegistry::new(&config)?;
    let addr = format!("{}:{}", config.host, config.port);

    let extractor = TableExtractor::new(Arc::new(registry), config.page, config.export.clone());
    let state = AppState {
        extractor: Arc::new(extractor),
        config: Arc::new(config),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Rebuild a grid from boxes supplied by the caller
async fn handle_grid(
    State(state): State<AppState>,
    Query(params): Query<TraceParams>,
    body: Bytes,
) -> Result<Json<GridOutcome>, TableError> {
    let request: GridRequest = serde_json::from_slice(&body)
        .map_err(|e| TableError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;

    let settings = state
        .extractor
        .settings()
        .with_overrides(request.config.as_ref())?;

    let boxes = request
        .boxes
        .into_iter()
        .map(BoundingBox::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let outcome = GridPipeline::new(settings.grid)
        .with_trace(params.trace)
        .run(&boxes)?;

    Ok(Json(outcome))
}

/// Detect boxes on an uploaded page and rebuild its grid, no OCR
async fn handle_detect(
    State(state): State<AppState>,
    Query(params): Query<TraceParams>,
    multipart: Multipart,
) -> Result<Json<Detection>, TableError> {
    let upload = read_upload(multipart, state.config.max_file_size).await?;
    let image = decode_image(&upload.data)?;

    let detection = state
        .extractor
        .detect(image, upload.config.as_ref(), params.trace)
        .await?;

    tracing::info!(
        boxes = detection.boxes.len(),
        rows = detection.outcome.grid.row_count(),
        preprocessing_time_ms = detection.preprocessing_time_ms,
        processing_time_ms = detection.processing_time_ms,
        "Detection completed"
    );

    Ok(Json(detection))
}

async fn handle_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TableExtraction>, TableError> {
    extract_upload(&state, None, multipart).await
}

async fn handle_extract_with_engine(
    State(state): State<AppState>,
    Path(engine): Path<String>,
    multipart: Multipart,
) -> Result<Json<TableExtraction>, TableError> {
    extract_upload(&state, Some(engine.as_str()), multipart).await
}

async fn extract_upload(
    state: &AppState,
    engine: Option<&str>,
    multipart: Multipart,
) -> Result<Json<TableExtraction>, TableError> {
    let upload = read_upload(multipart, state.config.max_file_size).await?;
    let image = decode_image(&upload.data)?;
    let name = upload.file_name.as_deref().unwrap_or("table");

    let extraction = state
        .extractor
        .extract(image, name, engine, upload.config.as_ref())
        .await?;

    Ok(Json(extraction))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.extractor.registry();
    let settings = state.extractor.settings();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr_enabled: !registry.list().is_empty(),
        default_engine: registry.default_name().map(str::to_string),
        available_engines: registry.info(),
        grid: settings.grid,
        threshold: settings.binarize.thresholder.as_str().to_string(),
        light_text: settings.binarize.light_text,
        denoise: settings.binarize.denoise,
        delimiter: char::from(state.config.export.delimiter).to_string(),
        column_names: state.config.export.column_names.clone(),
        max_file_size_bytes: state.config.max_file_size,
        default_language: state.config.default_language.clone(),
    })
}

/// Collect the `file` and optional `config` fields of a page upload
async fn read_upload(mut multipart: Multipart, max_file_size: usize) -> Result<Upload, TableError> {
    let mut data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut config: Option<Value> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TableError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                data = Some(field.bytes().await.map_err(|e| {
                    TableError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "config" => {
                let text = field.text().await.map_err(|e| {
                    TableError::InvalidRequest(format!("Failed to read config: {}", e))
                })?;
                config = Some(serde_json::from_str(&text).map_err(|e| {
                    TableError::InvalidConfig(format!("config is not valid JSON: {}", e))
                })?);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let data = data.ok_or(TableError::MissingFile)?;
    if data.len() > max_file_size {
        return Err(TableError::ImageTooLarge {
            size: data.len(),
            max: max_file_size,
        });
    }

    Ok(Upload {
        data,
        file_name,
        config,
    })
}

fn decode_image(data: &[u8]) -> Result<DynamicImage, TableError> {
    image::load_from_memory(data)
        .map_err(|e| TableError::UnsupportedFormat(format!("Failed to decode image: {}", e)))
}
