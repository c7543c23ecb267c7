// ollama-backend-rs/src/provisioner.rs
//
// Model provisioning and the guarded inference call
//
// Every inference request goes through `ModelProvisioner::generate`, which:
// 1. Returns immediately when the cache holds a fresh positive result
// 2. Otherwise lists daemon models, pulling the target model if it is absent
// 3. Runs the completion and resets the cache if the daemon says the model vanished
//
// Failures are never cached as final: only `Available` survives until the TTL,
// so a down daemon is re-probed on the very next request.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::availability::{AvailabilityCache, AvailabilityStatus};
use crate::ollama_client::{InferenceBackend, InferenceError, ModelListing, PullOutcome, MODEL};

/// What to do when a pull stream closes without an explicit success record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullPolicy {
    /// Treat a clean end of stream as success (some daemon versions omit the marker)
    #[default]
    AcceptStreamEnd,
    /// Only an explicit `"status": "success"` record counts
    RequireConfirmation,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Ollama service is not available at {url}. Make sure it's running.")]
    DaemonUnreachable { url: String },

    #[error("Failed to pull model {model}: {source}")]
    PullFailed {
        model: String,
        #[source]
        source: InferenceError,
    },

    #[error("Pull of model {model} ended without a success status")]
    PullUnconfirmed { model: String },
}

/// Error of a guarded inference call
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl CallError {
    pub fn is_daemon_unreachable(&self) -> bool {
        matches!(self, CallError::Provision(ProvisionError::DaemonUnreachable { .. }))
    }
}

pub struct ModelProvisioner {
    backend: Arc<dyn InferenceBackend>,
    cache: Arc<AvailabilityCache>,
    pull_policy: PullPolicy,
}

impl ModelProvisioner {
    pub fn new(backend: Arc<dyn InferenceBackend>, cache: Arc<AvailabilityCache>) -> Self {
        Self {
            backend,
            cache,
            pull_policy: PullPolicy::default(),
        }
    }

    pub fn with_pull_policy(mut self, pull_policy: PullPolicy) -> Self {
        self.pull_policy = pull_policy;
        self
    }

    pub fn model(&self) -> &'static str {
        MODEL
    }

    pub fn ollama_url(&self) -> &str {
        self.backend.endpoint()
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    /// Uncached model listing, used by health checks and the startup prober
    pub async fn model_listing(&self) -> ModelListing {
        self.backend.list_models().await
    }

    pub async fn ensure_available(&self) -> Result<(), ProvisionError> {
        self.ensure_available_at(Instant::now()).await
    }

    /// Provision the model, treating `now` as the current time for the cache.
    pub async fn ensure_available_at(&self, now: Instant) -> Result<(), ProvisionError> {
        if self.cache.is_fresh(now).await {
            return Ok(());
        }

        let listing = self.backend.list_models().await;
        if !listing.available {
            self.cache.write(AvailabilityStatus::Unavailable, now).await;
            let err = ProvisionError::DaemonUnreachable {
                url: self.backend.endpoint().to_string(),
            };
            log::error!("Error ensuring model availability: {}", err);
            return Err(err);
        }

        if listing.contains(MODEL) {
            self.cache.write(AvailabilityStatus::Available, now).await;
            return Ok(());
        }

        log::info!("Model {} not found. Pulling...", MODEL);
        match self.backend.pull_model(MODEL).await {
            Ok(PullOutcome::Confirmed) => {
                log::info!("Model {} pulled successfully", MODEL);
                self.cache.write(AvailabilityStatus::Available, now).await;
                Ok(())
            }
            Ok(PullOutcome::StreamEnded) => match self.pull_policy {
                PullPolicy::AcceptStreamEnd => {
                    log::info!("Model {} pull completed", MODEL);
                    self.cache.write(AvailabilityStatus::Available, now).await;
                    Ok(())
                }
                PullPolicy::RequireConfirmation => {
                    self.cache.write(AvailabilityStatus::Unavailable, now).await;
                    let err = ProvisionError::PullUnconfirmed {
                        model: MODEL.to_string(),
                    };
                    log::error!("Error ensuring model availability: {}", err);
                    Err(err)
                }
            },
            Err(source) => {
                self.cache.write(AvailabilityStatus::Unavailable, now).await;
                let err = ProvisionError::PullFailed {
                    model: MODEL.to_string(),
                    source,
                };
                log::error!("Error ensuring model availability: {}", err);
                Err(err)
            }
        }
    }

    /// Provision if needed, then run one completion against the model.
    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, CallError> {
        self.ensure_available().await?;

        match self.backend.generate(MODEL, prompt, system_prompt).await {
            Ok(text) => Ok(text),
            Err(err) => {
                if err.indicates_missing_model() {
                    log::warn!("Ollama reports model {} missing, invalidating availability cache", MODEL);
                    self.cache.invalidate().await;
                }
                log::error!("Error calling Ollama: {}", err);
                Err(err.into())
            }
        }
    }
}
