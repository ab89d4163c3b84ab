//! Pluggable code-understanding oracle seam.
//!
//! The scanner's "understanding" calls (feature extraction, similarity) go
//! through the [`CodeOracle`] trait so the oracle-backed primary path and the
//! deterministic fallbacks stay a runtime policy, not an inheritance tree.
//! Production code uses [`oracle_service::ChatOracleService`]; tests plug in
//! canned or failing oracles.
//!
//! Native `async fn` in traits — no `async-trait`, no boxed futures.

use oracle_service::{ChatOracleService, ConfigError, OracleError};
use serde_json::Value;
use tracing::trace;

/// Capability interface for the external code-understanding oracle.
pub trait CodeOracle {
    /// Sends one bounded prompt and returns the raw response text.
    ///
    /// The returned body is untrusted: callers must parse it with
    /// [`extract_json_object`] and branch to their fallback on any miss.
    fn complete_json(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String, OracleError>> + Send;
}

impl CodeOracle for ChatOracleService {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, OracleError> {
        self.complete(user, Some(system)).await
    }
}

/// `None` behaves as a permanently unavailable oracle, which lets a process
/// without oracle credentials run entirely on the deterministic fallbacks.
impl<O: CodeOracle + Sync> CodeOracle for Option<O> {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, OracleError> {
        match self {
            Some(o) => o.complete_json(system, user).await,
            None => Err(ConfigError::MissingVar("OPENAI_API_KEY").into()),
        }
    }
}

/// Extracts the first JSON object from untrusted oracle output.
///
/// Handles the common failure modes of LLM responses: markdown code fences,
/// prose before/after the payload, and trailing junk. Returns `None` when no
/// parseable object is present — parse failure is a first-class branch for
/// the callers, not an exceptional case.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();

    // Fast path: the whole body is the object (json_mode responses).
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    // Otherwise scan for a balanced `{...}` region, ignoring braces inside
    // string literals.
    let bytes = trimmed.as_bytes();
    let start = trimmed.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &trimmed[start..=i];
                    trace!(len = candidate.len(), "balanced JSON candidate found");
                    return serde_json::from_str::<Value>(candidate)
                        .ok()
                        .filter(Value::is_object);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let v = extract_json_object(r#"{"similarityScore": 0.8, "reason": "same loop"}"#).unwrap();
        assert_eq!(v["similarityScore"], 0.8);
    }

    #[test]
    fn parses_fenced_object_with_prose() {
        let raw = "Sure! Here is the analysis:\n```json\n{\"codeType\": \"function\"}\n```\nHope this helps.";
        let v = extract_json_object(raw).unwrap();
        assert_eq!(v["codeType"], "function");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scan() {
        let raw = r#"prefix {"reason": "uses { and } a lot", "similarityScore": 0.5} suffix"#;
        let v = extract_json_object(raw).unwrap();
        assert_eq!(v["similarityScore"], 0.5);
    }

    #[test]
    fn garbage_yields_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{truncated").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }
}
