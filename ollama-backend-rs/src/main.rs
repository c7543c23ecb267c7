// ollama-backend-rs/src/main.rs
// Trip extraction and experiment summary backend
// Port 3000 - HTTP entry point; inference runs on a local Ollama daemon
//
// Implements:
// - Lazy model provisioning with a five minute availability cache
// - Background startup probe so the listener never waits for the daemon
// - JSON validation and payload size limits

use std::sync::Arc;

use config_rs::BackendConfig;
use ollama_backend::availability::AvailabilityCache;
use ollama_backend::ollama_client::OllamaClient;
use ollama_backend::prober::{spawn_startup_probe, ProbeConfig};
use ollama_backend::provisioner::ModelProvisioner;
use ollama_backend::BackendService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BackendConfig::from_env();

    let client = OllamaClient::new(config.ollama_url.clone())?;
    let provisioner = Arc::new(ModelProvisioner::new(
        Arc::new(client),
        Arc::new(AvailabilityCache::default()),
    ));

    let service = Arc::new(BackendService::new(provisioner.clone()));
    let app = service.create_router();

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    log::info!("Server running on port {}", config.port);
    log::info!("Ollama URL: {}", config.ollama_url);
    log::info!("Using model: {}", provisioner.model());

    // Detached; the listener does not wait for the daemon
    let _probe = spawn_startup_probe(provisioner, ProbeConfig::default());

    axum::serve(listener, app).await?;

    Ok(())
}
