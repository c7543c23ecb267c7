//! Request validation
//!
//! Checks the two AI endpoints' bodies before any prompt is built, and
//! strips NUL bytes from user text so they never reach the daemon.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use crate::error::ErrorResponse;
use crate::gateway::experiment::SummaryRequest;

/// Maximum request payload size (100KB, the Express `json()` default)
pub const MAX_PAYLOAD_SIZE: usize = 100 * 1024;

/// Validation error for API requests
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("Text is required")]
    MissingText,

    #[error("At least one section is required")]
    NoSections,

    #[error("Invalid JSON body: {message}")]
    InvalidBody { status: StatusCode, message: String },
}

impl ApiValidationError {
    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status = match self {
            Self::MissingText | Self::NoSections => StatusCode::BAD_REQUEST,
            Self::InvalidBody { status, .. } => *status,
        };
        (status, Json(ErrorResponse::new(self.to_string())))
    }
}

impl From<JsonRejection> for ApiValidationError {
    fn from(rejection: JsonRejection) -> Self {
        ApiValidationError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Remove NUL bytes; everything else is passed to the model as written
pub fn sanitize_text(text: &str) -> String {
    text.replace('\u{0000}', "")
}

/// Validate the trip text, returning the sanitized copy
pub fn validate_trip_text(text: Option<&str>) -> Result<String, ApiValidationError> {
    let sanitized = text.map(sanitize_text).unwrap_or_default();
    if sanitized.trim().is_empty() {
        return Err(ApiValidationError::MissingText);
    }
    Ok(sanitized)
}

/// Validate a summary request, returning a sanitized copy
pub fn validate_summary_request(request: SummaryRequest) -> Result<SummaryRequest, ApiValidationError> {
    let clean = |field: Option<String>| field.map(|text| sanitize_text(&text));
    let sanitized = SummaryRequest {
        performance: clean(request.performance),
        description: clean(request.description),
        data_sources: clean(request.data_sources),
        notes: clean(request.notes),
    };

    if sanitized.is_empty() {
        return Err(ApiValidationError::NoSections);
    }
    Ok(sanitized)
}

/// Generate middleware config for payload limits
pub fn payload_limit_config() -> tower_http::limit::RequestBodyLimitLayer {
    tower_http::limit::RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE)
}
