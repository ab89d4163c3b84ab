//! OpenAI-compatible chat service used as the code-understanding oracle.
//!
//! Minimal, non-streaming client around the chat-completions REST API.
//! The endpoint is derived from `OracleModelConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions — chat completion (non-streaming)
//!
//! Constructor validation:
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://
//!
//! The response body is returned as plain text; callers must treat it as
//! untrusted (the scanner parses it with its own JSON-with-fallback path).
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::model_config::OracleModelConfig,
    error_handler::{ConfigError, OracleError, RequestError, make_snippet},
};

/// Thin client for an OpenAI-compatible chat API.
///
/// Constructed from a complete [`OracleModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct ChatOracleService {
    client: reqwest::Client,
    cfg: OracleModelConfig,
    url_chat: String,
}

impl ChatOracleService {
    /// Creates a new [`ChatOracleService`] from the given config.
    ///
    /// Validates the API key and endpoint scheme, then builds an HTTP client
    /// with default headers and a configurable timeout.
    ///
    /// # Errors
    /// - [`OracleError::Config`] with `MissingVar` if `cfg.api_key` is `None`
    /// - [`OracleError::Config`] with `InvalidFormat` if `cfg.endpoint` is invalid
    /// - [`OracleError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: OracleModelConfig) -> Result<Self, OracleError> {
        // 1) API key must be present.
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        // 2) Endpoint must use http/https.
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ConfigError::InvalidFormat {
                var: "ORACLE_URL",
                reason: "must start with http:// or https://",
            }
            .into());
        }

        // 3) Model must be set.
        if cfg.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }

        // 4) HTTP client: timeout + default headers.
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                RequestError::Decode(format!("invalid API key header: {e}"))
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let url_chat = format!("{}/v1/chat/completions", base);

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(30),
            json_mode = cfg.json_mode,
            "ChatOracleService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a **non-streaming** chat completion request.
    ///
    /// Minimal `messages` array:
    /// - optional system message (if provided)
    /// - user message with `prompt`.
    ///
    /// Mapped options from config: `model`, `temperature`, `top_p`,
    /// `max_tokens`, and — when `json_mode` is set — a
    /// `response_format: json_object` hint.
    ///
    /// # Errors
    /// - [`OracleError::Request`] with `HttpStatus` for non-2xx responses
    /// - [`OracleError::HttpTransport`] for client/network failures
    /// - [`OracleError::Request`] with `Decode` if the JSON cannot be parsed
    /// - [`OracleError::Request`] with `EmptyChoices` if no choices are returned
    pub async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, OracleError> {
        let started = Instant::now();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, prompt, system);

        debug!(
            model = %self.cfg.model,
            endpoint = %self.cfg.endpoint,
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "oracle chat completion returned non-success status"
            );

            return Err(RequestError::HttpStatus {
                status,
                url,
                snippet,
            }
            .into());
        }

        let out: ChatCompletionResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode chat completion response"
                );
                return Err(RequestError::Decode(format!(
                    "serde error: {e}; expected `choices[0].message.content`"
                ))
                .into());
            }
        };

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(RequestError::EmptyChoices)?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            out_len = content.len(),
            "chat completion completed"
        );

        Ok(content)
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Minimal request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Builds a minimal chat request from config, `prompt`, and an optional system message.
    fn from_cfg(cfg: &'a OracleModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: Some(sys),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: Some(prompt),
        });

        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
            response_format: cfg.json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
        }
    }
}

/// Chat message for the chat-completions API.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    /// One of: "system" | "user" | "assistant".
    role: &'a str,
    /// Plain string content.
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

/// Structured-response hint (`{"type": "json_object"}`).
#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    r#type: &'a str,
}

/// Minimal response for `/v1/chat/completions`.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(json_mode: bool) -> OracleModelConfig {
        OracleModelConfig {
            model: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("sk-test".into()),
            max_tokens: Some(512),
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(5),
            json_mode,
        }
    }

    #[test]
    fn request_body_includes_json_mode_only_when_enabled() {
        let with = cfg(true);
        let body = ChatCompletionRequest::from_cfg(&with, "hi", Some("sys"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");

        let without = cfg(false);
        let body = ChatCompletionRequest::from_cfg(&without, "hi", None);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn constructor_rejects_missing_key_and_bad_endpoint() {
        let mut c = cfg(true);
        c.api_key = None;
        assert!(ChatOracleService::new(c).is_err());

        let mut c = cfg(true);
        c.endpoint = "not-a-url".into();
        assert!(ChatOracleService::new(c).is_err());

        let mut c = cfg(true);
        c.model = "  ".into();
        assert!(ChatOracleService::new(c).is_err());
    }
}
