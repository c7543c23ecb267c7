//! config-rs/lib.rs
//! Shared configuration utilities for the Ollama backend
//! Reads listen port and daemon address from the environment with logged fallbacks

use std::env;
use std::net::{Ipv4Addr, SocketAddr};

/// Port used when `PORT` is unset or invalid
pub const DEFAULT_PORT: u16 = 3000;

/// Daemon address used when `OLLAMA_URL` is unset
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Get the HTTP listen port from `PORT`
///
/// # Arguments
/// * `default_port` - The port to use if `PORT` is missing or not a valid u16
///
/// # Returns
/// The port number the backend should listen on
pub fn get_port(default_port: u16) -> u16 {
    port_from_var("PORT", default_port)
}

fn port_from_var(var_name: &str, default_port: u16) -> u16 {
    match env::var(var_name) {
        Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}: {:?}, using default {}", var_name, raw, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create the SocketAddr the backend binds to
///
/// The backend always listens on every interface, like the container setup expects.
pub fn get_bind_address(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Get the Ollama daemon base URL from `OLLAMA_URL`
///
/// Trailing slashes are stripped so callers can append `/api/...` paths directly.
pub fn get_ollama_url() -> String {
    url_from_var("OLLAMA_URL", DEFAULT_OLLAMA_URL)
}

fn url_from_var(var_name: &str, default_url: &str) -> String {
    let raw = env::var(var_name).unwrap_or_default();
    let trimmed = raw.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return default_url.to_string();
    }

    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        log::warn!(
            "{} has no scheme ({:?}), assuming http://",
            var_name,
            trimmed
        );
        return format!("http://{}", trimmed);
    }

    trimmed.to_string()
}

/// Snapshot of the backend configuration taken at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub port: u16,
    pub bind_addr: SocketAddr,
    pub ollama_url: String,
}

impl BackendConfig {
    /// Load `.env` (if present) and read the configuration from the environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let port = get_port(DEFAULT_PORT);
        Self {
            port,
            bind_addr: get_bind_address(port),
            ollama_url: get_ollama_url(),
        }
    }
}
