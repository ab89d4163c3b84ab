//! Default oracle configs loaded strictly from environment variables.
//!
//! This module provides convenience constructors for [`OracleModelConfig`].
//! The oracle is an OpenAI-compatible chat endpoint used for two jobs in the
//! scanner: semantic feature extraction and similarity judgments. Both use
//! the same model config with JSON response mode enabled.
//!
//! # Environment variables
//!
//! - `ORACLE_URL`       = API base (default `https://api.openai.com`)
//! - `ORACLE_MODEL`     = model identifier (mandatory)
//! - `OPENAI_API_KEY`   = bearer token (mandatory)
//! - `ORACLE_MAX_TOKENS` = optional max tokens (u32)
//! - `ORACLE_TIMEOUT_SECS` = optional request timeout (u64)

use crate::{
    config::model_config::OracleModelConfig,
    error_handler::{OracleError, env_opt_u32, env_opt_u64, must_env, validate_http_endpoint},
};

/// Resolves the oracle endpoint from the environment.
///
/// Falls back to the public OpenAI API base when `ORACLE_URL` is unset.
fn oracle_endpoint() -> Result<String, OracleError> {
    let url = std::env::var("ORACLE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://api.openai.com".to_string());
    validate_http_endpoint("ORACLE_URL", &url)?;
    Ok(url)
}

/// Constructs the config used for code-understanding calls.
///
/// # Env
/// - `ORACLE_MODEL` (required)
/// - `OPENAI_API_KEY` (required)
/// - `ORACLE_MAX_TOKENS`, `ORACLE_TIMEOUT_SECS` (optional)
///
/// # Defaults
/// - `temperature = Some(0.2)` (mostly deterministic judgments)
/// - `timeout_secs = Some(30)` when unset
/// - `json_mode = true`
pub fn config_oracle() -> Result<OracleModelConfig, OracleError> {
    let endpoint = oracle_endpoint()?;
    let model = must_env("ORACLE_MODEL")?;
    let api_key = must_env("OPENAI_API_KEY")?;
    let max_tokens = env_opt_u32("ORACLE_MAX_TOKENS")?;
    let timeout_secs = env_opt_u64("ORACLE_TIMEOUT_SECS")?.or(Some(30));

    Ok(OracleModelConfig {
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs,
        json_mode: true,
    })
}
