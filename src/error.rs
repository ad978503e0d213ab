use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("No text boxes left to cluster")]
    EmptyInput,

    #[error("Found {found} columns, expected {expected}")]
    InsufficientColumns { found: usize, expected: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("OCR is not available: {0}")]
    OcrUnavailable(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TableError {
    /// Stable machine-readable code, also used in the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            TableError::InvalidBoundingBox(_) => "INVALID_BOUNDING_BOX",
            TableError::EmptyInput => "EMPTY_INPUT",
            TableError::InsufficientColumns { .. } => "INSUFFICIENT_COLUMNS",
            TableError::InvalidConfig(_) => "INVALID_CONFIG",
            TableError::InitializationError(_) => "INIT_ERROR",
            TableError::ProcessingError(_) => "PROCESSING_ERROR",
            TableError::PreprocessingError(_) => "PREPROCESSING_ERROR",
            TableError::OcrUnavailable(_) => "OCR_UNAVAILABLE",
            TableError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            TableError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            TableError::MissingFile => "MISSING_FILE",
            TableError::InvalidRequest(_) => "INVALID_REQUEST",
            TableError::ExportError(_) => "EXPORT_ERROR",
            TableError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            TableError::InvalidBoundingBox(_)
            | TableError::EmptyInput
            | TableError::InsufficientColumns { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TableError::InvalidConfig(_)
            | TableError::UnsupportedFormat(_)
            | TableError::MissingFile
            | TableError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            TableError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            TableError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TableError::InitializationError(_)
            | TableError::ProcessingError(_)
            | TableError::PreprocessingError(_)
            | TableError::ExportError(_)
            | TableError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for TableError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}
