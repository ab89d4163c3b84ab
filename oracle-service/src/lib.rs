//! Code-understanding oracle client.
//!
//! This crate wraps an OpenAI-compatible chat-completions endpoint behind a
//! small, validated client with a structured-JSON response mode. It is the
//! "primary path" backend for feature extraction and similarity scoring in
//! the repository scanner; callers are expected to parse the returned text
//! defensively and fall back to their deterministic paths on any failure.
//!
//! Construct once, wrap in `Arc`, and pass clones to dependents.

pub mod config;
pub mod error_handler;
pub mod services;

pub use config::default_config::config_oracle;
pub use config::model_config::OracleModelConfig;
pub use error_handler::{ConfigError, OracleError, RequestError};
pub use services::chat_service::ChatOracleService;
