//! In-memory stand-in for the Ollama daemon

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use crate::ollama_client::{InferenceBackend, InferenceError, ModelListing, PullOutcome, MODEL};

pub const STUB_URL: &str = "http://ollama.test:11434";

#[derive(Debug)]
pub struct StubState {
    pub reachable: bool,
    /// Number of initial `list_models` calls that fail before the daemon answers
    pub unreachable_for: u32,
    pub models: Vec<String>,
    pub pull_result: Result<PullOutcome, InferenceError>,
    /// Number of upcoming pulls that fail before `pull_result` applies
    pub failing_pulls: u32,
    pub generate_result: Result<String, InferenceError>,
    pub list_calls: u32,
    pub pull_calls: u32,
    pub generate_calls: u32,
    /// (prompt, system prompt) of every generate call
    pub prompts: Vec<(String, Option<String>)>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            reachable: true,
            unreachable_for: 0,
            models: Vec::new(),
            pull_result: Ok(PullOutcome::Confirmed),
            failing_pulls: 0,
            generate_result: Ok("ok".to_string()),
            list_calls: 0,
            pull_calls: 0,
            generate_calls: 0,
            prompts: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct StubBackend {
    state: Mutex<StubState>,
}

impl StubBackend {
    pub fn new(state: StubState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// A reachable daemon that already has the model
    pub fn ready() -> Self {
        Self::new(StubState {
            models: vec![MODEL.to_string()],
            ..StubState::default()
        })
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl InferenceBackend for StubBackend {
    fn endpoint(&self) -> &str {
        STUB_URL
    }

    async fn list_models(&self) -> ModelListing {
        let mut state = self.state();
        state.list_calls += 1;
        if !state.reachable || state.list_calls <= state.unreachable_for {
            return ModelListing::unreachable();
        }
        ModelListing {
            available: true,
            models: state.models.clone(),
        }
    }

    async fn pull_model(&self, model: &str) -> Result<PullOutcome, InferenceError> {
        let mut state = self.state();
        state.pull_calls += 1;
        if state.failing_pulls > 0 {
            state.failing_pulls -= 1;
            return Err(InferenceError::PullFailed("connection reset".to_string()));
        }
        let result = state.pull_result.clone();
        if result.is_ok() && !state.models.iter().any(|m| m == model) {
            state.models.push(model.to_string());
        }
        result
    }

    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, InferenceError> {
        let mut state = self.state();
        state.generate_calls += 1;
        state
            .prompts
            .push((prompt.to_string(), system_prompt.map(str::to_string)));
        state.generate_result.clone()
    }
}
