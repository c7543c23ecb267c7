use std::sync::Arc;
use axum::{
    Router,
    routing::{get, post},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{CorsLayer, Any};

pub mod availability;
pub mod error;
pub mod gateway;
pub mod ollama_client;
pub mod prober;
pub mod provisioner;
pub mod validation;

#[cfg(test)]
mod tests;

use error::ApiError;
use gateway::experiment::SummaryRequest;
use provisioner::ModelProvisioner;
use validation::{
    payload_limit_config,
    validate_summary_request,
    validate_trip_text,
    ApiValidationError,
};

/// Trip request body (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct TripProcessRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OllamaHealthResponse {
    pub status: String,
    pub ollama: String,
    pub model: String,
    pub model_available: bool,
    pub available_models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OllamaUnhealthyResponse {
    pub status: String,
    pub message: String,
}

/// HTTP surface of the backend
pub struct BackendService {
    provisioner: Arc<ModelProvisioner>,
}

impl BackendService {
    pub fn new(provisioner: Arc<ModelProvisioner>) -> Self {
        Self { provisioner }
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/api/health/ollama", get(Self::ollama_health_handler))
            .route("/api/trip/process", post(Self::trip_process_handler))
            .route("/api/experiment/summarize", post(Self::summarize_handler))
            .layer(payload_limit_config())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .with_state(self)
    }

    async fn health_handler() -> impl IntoResponse {
        Json(HealthResponse {
            status: "healthy".to_string(),
        })
    }

    /// Reports the daemon's live state; never reads or writes the availability cache
    async fn ollama_health_handler(State(state): State<Arc<Self>>) -> Response {
        let listing = state.provisioner.model_listing().await;

        if !listing.available {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(OllamaUnhealthyResponse {
                    status: "unhealthy".to_string(),
                    message: "Ollama service is not available".to_string(),
                }),
            )
                .into_response();
        }

        let model = state.provisioner.model();
        Json(OllamaHealthResponse {
            status: "healthy".to_string(),
            ollama: "available".to_string(),
            model: model.to_string(),
            model_available: listing.contains(model),
            available_models: listing.models,
        })
        .into_response()
    }

    async fn trip_process_handler(
        State(state): State<Arc<Self>>,
        payload: Result<Json<TripProcessRequest>, JsonRejection>,
    ) -> Result<Response, ApiError> {
        let Json(request) = payload.map_err(ApiValidationError::from)?;
        let text = validate_trip_text(request.text.as_deref())?;

        log::info!("Processing travel text ({} chars)", text.chars().count());

        let result = gateway::extract_travel_items(&state.provisioner, &text)
            .await
            .map_err(|err| ApiError::from_gateway("Failed to process travel text", err))?;

        Ok(Json(result).into_response())
    }

    async fn summarize_handler(
        State(state): State<Arc<Self>>,
        payload: Result<Json<SummaryRequest>, JsonRejection>,
    ) -> Result<Response, ApiError> {
        let Json(request) = payload.map_err(ApiValidationError::from)?;
        let request = validate_summary_request(request)?;

        let summary = gateway::summarize_experiment(&state.provisioner, &request)
            .await
            .map_err(|err| ApiError::from_gateway("Failed to generate summary", err))?;

        Ok(Json(SummaryResponse { summary }).into_response())
    }
}
