//! Unified error handling for `oracle-service`.
//!
//! This module exposes a single top-level error type [`OracleError`] for the
//! whole library and groups domain-specific errors in nested enums
//! ([`ConfigError`], [`RequestError`]). Small helpers for reading/validating
//! environment variables are provided and return the unified [`Result<T>`]
//! alias.
//!
//! All messages include the suffix `[Oracle Service]` to simplify attribution
//! in logs.

use reqwest::StatusCode;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, OracleError>;

/// Top-level error for the `oracle-service` crate.
///
/// Variants wrap domain-specific enums (config/request) and the transport
/// case. Prefer adding new sub-enums for distinct domains instead of growing
/// this type indefinitely. Request timeouts surface as `HttpTransport` with
/// `reqwest::Error::is_timeout()` set.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OracleError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Completion request errors (status, decode, empty choices).
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[Oracle Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),
}

/// Error enum for environment/config-driven setup.
///
/// Keep this focused: only errors that realistically happen at config
/// load/validation time.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[Oracle Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like limits or timeouts).
    #[error("[Oracle Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `ORACLE_MAX_TOKENS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[Oracle Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `ORACLE_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// Model name was empty or invalid.
    #[error("[Oracle Service] model name must not be empty")]
    EmptyModel,
}

/// Error enum for a single completion request.
///
/// Represents upstream protocol and decoding problems. Transport failures are
/// covered by [`OracleError::HttpTransport`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RequestError {
    /// Upstream returned a non-successful HTTP status.
    #[error("[Oracle Service] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[Oracle Service] decode error: {0}")]
    Decode(String),

    /// Completion response contained no usable choices.
    #[error("[Oracle Service] empty choices in completion response")]
    EmptyChoices,
}

/// Builds a short, single-line snippet of a response body for logs/errors.
///
/// Truncation counts characters, never raw bytes, so multi-byte bodies (the
/// upstream may answer in any language) cannot split a code point.
pub fn make_snippet(body: &str) -> String {
    const MAX_CHARS: usize = 240;
    let one_line = body.split_whitespace().collect::<Vec<_>>().join(" ");
    match one_line.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}…", &one_line[..idx]),
        None => one_line,
    }
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`OracleError::Config`] with [`ConfigError::MissingVar`] if the
/// variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`OracleError::Config`] with [`ConfigError::InvalidNumber`] if the
/// variable is set but not a valid `u32`.
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.parse::<u32>().map(Some).map_err(|_| {
            OracleError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u32",
            })
        }),
        _ => Ok(None),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`OracleError::Config`] with [`ConfigError::InvalidNumber`] if the
/// variable is set but not a valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.parse::<u64>().map(Some).map_err(|_| {
            OracleError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        _ => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers (return unified `Result<T>`)                           */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`OracleError::Config`] with [`ConfigError::InvalidFormat`] when
/// the string does not start with a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_single_line_and_bounded() {
        let body = "line one\nline two\nline three";
        let s = make_snippet(body);
        assert!(!s.contains('\n'));

        let long = "x".repeat(1000);
        assert!(make_snippet(&long).len() <= 244);
    }

    #[test]
    fn snippet_truncates_on_char_boundaries() {
        // A long non-ASCII body must truncate between characters, not bytes.
        let body = format!("a{}", "€".repeat(300));
        let s = make_snippet(&body);
        assert!(s.ends_with('…'));
        assert_eq!(s.chars().count(), 241);
    }

    #[test]
    fn endpoint_validation() {
        assert!(validate_http_endpoint("ORACLE_URL", "https://api.openai.com").is_ok());
        assert!(validate_http_endpoint("ORACLE_URL", "ftp://nope").is_err());
    }
}
