//! Prompt gateway
//!
//! The two AI operations exposed over HTTP. Each builds its prompt pair,
//! runs it through the provisioner's guarded call and post-processes the
//! reply. Input validation happens before these are called.

pub mod city;
pub mod experiment;
pub mod trip;

use thiserror::Error;

use crate::provisioner::{CallError, ModelProvisioner};
use experiment::{build_summary_prompt, SummaryRequest, SUMMARY_SYSTEM_PROMPT};
use trip::{build_trip_prompt, parse_travel_response, TravelExtractionResult, TravelParseError, TRIP_SYSTEM_PROMPT};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Call(#[from] CallError),

    /// The model answered but the reply was not usable; `raw` is kept for diagnosis
    #[error("{source}")]
    Parse {
        #[source]
        source: TravelParseError,
        raw: String,
    },
}

pub async fn extract_travel_items(
    provisioner: &ModelProvisioner,
    text: &str,
) -> Result<TravelExtractionResult, GatewayError> {
    let prompt = build_trip_prompt(text);
    let response = provisioner.generate(&prompt, Some(TRIP_SYSTEM_PROMPT)).await?;

    match parse_travel_response(&response, text) {
        Ok(result) => {
            log::info!(
                "Extracted {} travel items (city: {})",
                result.items.len(),
                result.city.as_deref().unwrap_or("none")
            );
            Ok(result)
        }
        Err(source) => {
            log::error!("Error parsing AI response: {}", source);
            log::debug!("Raw response: {}", response);
            Err(GatewayError::Parse {
                source,
                raw: response,
            })
        }
    }
}

/// Returns the model's text unchanged; this endpoint is free-form prose.
pub async fn summarize_experiment(
    provisioner: &ModelProvisioner,
    request: &SummaryRequest,
) -> Result<String, GatewayError> {
    let prompt = build_summary_prompt(request);
    let summary = provisioner.generate(&prompt, Some(SUMMARY_SYSTEM_PROMPT)).await?;
    Ok(summary)
}
