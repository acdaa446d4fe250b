use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::types::school_form::SCHOOL_FORM;

#[derive(Debug, ThisError)]
pub enum SchoolsError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration error: {0}")]
    ConfigValue(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload directory unavailable: {0}")]
    UploadDir(std::io::Error),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Multipart rejection: {0}")]
    MultipartRejected(#[from] MultipartRejection),

    #[error("School image is required")]
    MissingImage,

    #[error("Only one school image may be submitted")]
    MultipleImages,

    #[error("Unsupported image content type: {0}")]
    NotAnImage(String),

    #[error("Image exceeds {limit} bytes")]
    ImageTooLarge { limit: u64 },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Insert failed: {0}")]
    InsertFailed(SqlxError),

    #[error("Fetch failed: {0}")]
    FetchFailed(SqlxError),

    #[error("School {0} not found")]
    NotFound(i64),
}

impl From<figment::Error> for SchoolsError {
    fn from(e: figment::Error) -> Self {
        SchoolsError::Config(Box::new(e))
    }
}

impl From<std::convert::Infallible> for SchoolsError {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

impl SchoolsError {
    /// Status and short client-facing message. Driver detail never leaves the server.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            SchoolsError::MissingImage => {
                (StatusCode::BAD_REQUEST, "School image is required.".into())
            }
            SchoolsError::MultipleImages => (
                StatusCode::BAD_REQUEST,
                "Only one school image may be submitted.".into(),
            ),
            SchoolsError::NotAnImage(_) => (
                StatusCode::BAD_REQUEST,
                "School image must be an image file.".into(),
            ),
            SchoolsError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, validation_message(errors))
            }
            SchoolsError::ImageTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("School image exceeds the {limit} byte limit."),
            ),
            SchoolsError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large.".into(),
            ),
            SchoolsError::Multipart(_) | SchoolsError::MultipartRejected(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing form data.".into(),
            ),
            SchoolsError::UploadDir(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not prepare the upload directory.".into(),
            ),
            SchoolsError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store school image.".into(),
            ),
            SchoolsError::InsertFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database insertion failed.".into(),
            ),
            SchoolsError::FetchFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch schools data.".into(),
            ),
            SchoolsError::NotFound(_) => (StatusCode::NOT_FOUND, "School not found.".into()),
            SchoolsError::Config(_)
            | SchoolsError::ConfigValue(_)
            | SchoolsError::UrlParse(_)
            | SchoolsError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred.".into(),
            ),
        }
    }
}

impl IntoResponse for SchoolsError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = %status, error = %self, "request failed");
        } else {
            warn!(status = %status, error = %self, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Joins field messages in form order so clients see a stable message.
fn validation_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let messages: Vec<String> = SCHOOL_FORM
        .iter()
        .filter_map(|rule| field_errors.get(rule.name))
        .flat_map(|errs| errs.iter())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
        .collect();

    if messages.is_empty() {
        "Invalid school data.".to_string()
    } else {
        messages.join("; ")
    }
}
