//! Unit tests for the Ollama backend
//!
//! Provisioning, probing and gateway behaviour against an in-memory daemon.

pub mod stub_backend;
