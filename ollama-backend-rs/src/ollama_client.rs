// ollama-backend-rs/src/ollama_client.rs
//
// HTTP client for the local Ollama daemon
//
// This module provides:
// - Model listing via GET /api/tags (a down daemon is reported as data, not as an error)
// - Model pulls via POST /api/pull, consuming the newline-delimited JSON progress stream
// - Non-streaming inference via POST /api/generate
// - Classification of inference errors so the provisioner can drop stale availability
//
// There is deliberately no request timeout on generate: a slow model keeps the
// calling request open until the daemon answers.

use async_trait::async_trait;
use futures_util::{pin_mut, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// The single model this backend runs. Not configurable at runtime.
pub const MODEL: &str = "llama3.2:3b";

/// Result of asking the daemon which models it has locally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelListing {
    pub available: bool,
    pub models: Vec<String>,
}

impl ModelListing {
    /// Listing returned when the daemon cannot be reached
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|name| name == model)
    }
}

/// How a pull stream terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// A progress record with `"status": "success"` was received
    Confirmed,
    /// The stream closed without any success record
    StreamEnded,
}

// Error type for daemon calls
// Only `Http` carries enough information to tell whether the model disappeared
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Ollama API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("No response from Ollama model")]
    EmptyResponse,

    #[error("Failed to pull model: {0}")]
    PullFailed(String),

    #[error("Invalid response from Ollama: {0}")]
    Decode(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl InferenceError {
    /// True when the daemon's answer suggests the model is no longer loaded
    pub fn indicates_missing_model(&self) -> bool {
        match self {
            InferenceError::Http { status, body } => *status == 404 || body.contains("model"),
            _ => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            InferenceError::Network(format!("Connection failed: {}", err))
        } else {
            InferenceError::Network(err.to_string())
        }
    }
}

/// The three daemon operations the provisioner and gateway depend on.
///
/// `OllamaClient` is the production implementation; tests substitute stubs.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Base URL of the daemon, used in diagnostics
    fn endpoint(&self) -> &str;

    /// List local models. Never fails: an unreachable daemon yields `available == false`.
    async fn list_models(&self) -> ModelListing;

    /// Pull `model`, consuming the progress stream until success or end of stream.
    async fn pull_model(&self, model: &str) -> Result<PullOutcome, InferenceError>;

    /// Run a single non-streaming completion.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, InferenceError>;
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Option<Vec<TagModel>>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// One record of the pull progress stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullProgress {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl PullProgress {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// Incremental line splitter for the pull endpoint's NDJSON body.
///
/// Chunks may split records anywhere, so bytes are buffered until a newline.
/// Blank lines and lines that are not a JSON object are skipped.
#[derive(Debug, Default)]
pub struct PullStreamDecoder {
    buffer: Vec<u8>,
}

impl PullStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every complete record it finished
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<PullProgress> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(record) = parse_progress_line(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Parse whatever is left once the stream has closed
    pub fn finish(&mut self) -> Option<PullProgress> {
        let rest = std::mem::take(&mut self.buffer);
        parse_progress_line(&rest)
    }
}

fn parse_progress_line(line: &[u8]) -> Option<PullProgress> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<PullProgress>(trimmed) {
        Ok(record) => Some(record),
        Err(err) => {
            log::debug!("Skipping malformed pull progress line ({}): {:?}", err, trimmed);
            None
        }
    }
}

// Returns Some when the record ends the pull
fn check_progress(model: &str, record: &PullProgress) -> Option<Result<PullOutcome, InferenceError>> {
    if let Some(error) = &record.error {
        return Some(Err(InferenceError::PullFailed(error.clone())));
    }
    if record.is_success() {
        return Some(Ok(PullOutcome::Confirmed));
    }

    match (&record.status, record.completed, record.total) {
        (Some(status), Some(completed), Some(total)) if total > 0 => {
            log::debug!("Pulling {}: {} ({}/{} bytes)", model, status, completed, total)
        }
        (Some(status), _, _) => log::debug!("Pulling {}: {}", model, status),
        _ => {}
    }
    None
}

/// Drain a pull response body, stopping at the first success or error record.
pub async fn consume_pull_stream<S, B, E>(model: &str, stream: S) -> Result<PullOutcome, InferenceError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    pin_mut!(stream);
    let mut decoder = PullStreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| InferenceError::Network(format!("Pull stream interrupted: {}", e)))?;
        for record in decoder.feed(chunk.as_ref()) {
            if let Some(verdict) = check_progress(model, &record) {
                return verdict;
            }
        }
    }

    if let Some(record) = decoder.finish() {
        if let Some(verdict) = check_progress(model, &record) {
            return verdict;
        }
    }

    Ok(PullOutcome::StreamEnded)
}

/// reqwest-backed client for a single Ollama daemon
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .user_agent(concat!("ollama-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InferenceError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn reason_or_status(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn list_models(&self) -> ModelListing {
        let response = match self.client.get(self.url("/api/tags")).send().await {
            Ok(resp) => resp,
            Err(err) => {
                log::debug!("Ollama tags request failed: {}", err);
                return ModelListing::unreachable();
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("Ollama tags request returned {}", status);
            return ModelListing::unreachable();
        }

        match response.json::<TagsResponse>().await {
            Ok(tags) => ModelListing {
                available: true,
                models: tags
                    .models
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| m.name)
                    .collect(),
            },
            Err(err) => {
                log::warn!("Could not decode Ollama tags response: {}", err);
                ModelListing::unreachable()
            }
        }
    }

    async fn pull_model(&self, model: &str) -> Result<PullOutcome, InferenceError> {
        let response = self
            .client
            .post(self.url("/api/pull"))
            .json(&PullRequest { name: model })
            .send()
            .await
            .map_err(InferenceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::PullFailed(reason_or_status(status)));
        }

        consume_pull_stream(model, response.bytes_stream()).await
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, InferenceError> {
        let request_body = GenerateRequest {
            model,
            prompt,
            system: system_prompt,
            stream: false,
        };

        log::info!(
            "Sending generate request to {} (model: {}, prompt length: {})",
            self.base_url,
            model,
            prompt.len()
        );

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request_body)
            .send()
            .await
            .map_err(InferenceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = if text.trim().is_empty() {
                reason_or_status(status)
            } else {
                text
            };
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))?;

        match data.response {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(InferenceError::EmptyResponse),
        }
    }
}
