// ollama-backend-rs/src/prober.rs
//
// Startup readiness probe
//
// Runs once as a detached task after the listener is bound. It waits for the
// daemon with exponential backoff (3s, x1.5, capped at 10s) and provisions the
// model as soon as the daemon answers. Giving up is not an error: the first
// inference request provisions lazily instead.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::provisioner::ModelProvisioner;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub max_attempts: u32,
    /// Pause before the first attempt, giving a co-started daemon time to boot
    pub startup_delay: Duration,
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            startup_delay: Duration::from_secs(2),
            initial_interval: Duration::from_secs(3),
            multiplier: 1.5,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl ProbeConfig {
    /// Deterministic backoff: no jitter and no overall deadline
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            multiplier: self.multiplier,
            max_interval: self.max_interval,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready { attempts: u32 },
    GaveUp { attempts: u32 },
}

pub async fn probe_until_ready(provisioner: &ModelProvisioner, config: &ProbeConfig) -> ProbeOutcome {
    if !config.startup_delay.is_zero() {
        tokio::time::sleep(config.startup_delay).await;
    }

    let mut backoff = config.backoff();

    for attempt in 1..=config.max_attempts {
        log::info!("Checking Ollama availability ({}/{})...", attempt, config.max_attempts);

        if provisioner.model_listing().await.available {
            log::info!("Ollama is available. Checking model...");
            match provisioner.ensure_available().await {
                Ok(()) => {
                    log::info!("Model {} is ready", provisioner.model());
                    return ProbeOutcome::Ready { attempts: attempt };
                }
                Err(err) => log::warn!("Error ensuring model: {}", err),
            }
        } else {
            log::info!("Ollama not ready yet at {}", provisioner.ollama_url());
        }

        if attempt < config.max_attempts {
            let delay = backoff.next_backoff().unwrap_or(config.max_interval);
            log::info!("Waiting {:.2}s before retry...", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }

    log::warn!("Ollama initialization timeout. It may still be starting up.");
    log::warn!("The model will be pulled automatically on first AI request.");
    ProbeOutcome::GaveUp {
        attempts: config.max_attempts,
    }
}

/// Spawn the probe without blocking the caller
pub fn spawn_startup_probe(
    provisioner: Arc<ModelProvisioner>,
    config: ProbeConfig,
) -> JoinHandle<ProbeOutcome> {
    tokio::spawn(async move { probe_until_ready(&provisioner, &config).await })
}
