//! HTTP error mapping
//!
//! Every failure is converted to a JSON body with an `error` field at the
//! route boundary; nothing here is fatal to the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::gateway::GatewayError;
use crate::provisioner::CallError;
use crate::validation::ApiValidationError;

/// Hint attached to upstream failures
pub const HEALTH_HINT: &str = "Check /api/health/ollama to verify Ollama status";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            raw: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidRequest(#[from] ApiValidationError),

    /// `action` names the endpoint's job, e.g. "Failed to generate summary"
    #[error("{action}: {source}")]
    Upstream {
        action: &'static str,
        #[source]
        source: CallError,
    },

    #[error("Failed to parse AI response: {details}")]
    Parse { details: String, raw: String },
}

impl ApiError {
    pub fn from_gateway(action: &'static str, err: GatewayError) -> Self {
        match err {
            GatewayError::Call(source) => ApiError::Upstream { action, source },
            GatewayError::Parse { source, raw } => ApiError::Parse {
                details: source.to_string(),
                raw,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(err) => err.to_response().0,
            ApiError::Upstream { source, .. } if source.is_daemon_unreachable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Upstream { .. } | ApiError::Parse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        match self {
            ApiError::InvalidRequest(err) => err.to_response(),
            ApiError::Upstream { .. } => (
                self.status_code(),
                Json(ErrorResponse {
                    error: self.to_string(),
                    details: Some(HEALTH_HINT.to_string()),
                    raw: None,
                }),
            ),
            ApiError::Parse { details, raw } => (
                self.status_code(),
                Json(ErrorResponse {
                    error: "Failed to parse AI response".to_string(),
                    details: Some(details.clone()),
                    raw: Some(raw.clone()),
                }),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            log::error!("{}", self);
        }
        self.to_response().into_response()
    }
}
