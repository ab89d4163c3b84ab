//! Similarity scoring: oracle judgment with a Jaccard fallback.
//!
//! The score is always query-relative and in `[0, 1]`. The oracle path sends
//! both snippets truncated to the configured budget; whenever that call
//! fails or returns an unparseable body, the deterministic fallback computes
//! Jaccard similarity over normalized token sets. The fallback tolerates
//! snippets of arbitrary size and is fully deterministic.

use std::collections::HashSet;

use oracle_service::OracleError;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::oracle::{CodeOracle, extract_json_object};
use crate::prompts;

/// Oracle response schema for similarity judgments.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimilarityPayload {
    similarity_score: f64,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
}

/// Scores similarity between two snippets. Never fails.
///
/// Returns `0.0` immediately when either snippet is empty. Oracle scores are
/// clamped to `[0, 1]`; any oracle failure degrades to
/// [`jaccard_similarity`].
pub async fn score_similarity<O: CodeOracle>(
    oracle: &O,
    code_a: &str,
    code_b: &str,
    snippet_chars: usize,
) -> f64 {
    if code_a.trim().is_empty() || code_b.trim().is_empty() {
        return 0.0;
    }

    match oracle_similarity(oracle, code_a, code_b, snippet_chars).await {
        Ok(score) => score,
        Err(e) => {
            warn!("oracle similarity failed, using jaccard fallback: {e}");
            jaccard_similarity(code_a, code_b)
        }
    }
}

async fn oracle_similarity<O: CodeOracle>(
    oracle: &O,
    code_a: &str,
    code_b: &str,
    snippet_chars: usize,
) -> Result<f64, OracleError> {
    let prompt = prompts::similarity_prompt(code_a, code_b, snippet_chars);
    let raw = oracle
        .complete_json(prompts::SIMILARITY_SYSTEM, &prompt)
        .await?;

    let json = extract_json_object(&raw).ok_or_else(|| {
        OracleError::Request(oracle_service::RequestError::Decode(
            "no JSON object in similarity response".into(),
        ))
    })?;

    let payload: SimilarityPayload = serde_json::from_value(json).map_err(|e| {
        OracleError::Request(oracle_service::RequestError::Decode(format!(
            "similarity schema mismatch: {e}"
        )))
    })?;

    let score = payload.similarity_score.clamp(0.0, 1.0);
    debug!(score, "oracle similarity scored");
    Ok(score)
}

/// Jaccard similarity over normalized token sets: `|A∩B| / |A∪B|`.
///
/// Normalization strips comments, lower-cases, and splits on whitespace and
/// punctuation, keeping tokens longer than one character. Two snippets whose
/// token sets are both empty score `0.0` — the empty-union case is guarded
/// explicitly so the division can never produce NaN.
pub fn jaccard_similarity(code_a: &str, code_b: &str) -> f64 {
    let a = token_set(code_a);
    let b = token_set(code_b);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    intersection as f64 / union as f64
}

/// Normalizes a snippet into a set of lower-cased tokens (length > 1).
fn token_set(code: &str) -> HashSet<String> {
    strip_comments(code)
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Removes `//`, `#` line comments and `/* ... */` block comments.
///
/// A lexer-free approximation: it does not track string literals, which is
/// acceptable for a similarity fallback — both sides are normalized the same
/// way.
fn strip_comments(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    let mut in_block = false;

    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            }
            continue;
        }
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                in_block = true;
            }
            '/' if chars.peek() == Some(&'/') => {
                // Skip to end of line, keep the newline as a separator.
                for nc in chars.by_ref() {
                    if nc == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '#' => {
                for nc in chars.by_ref() {
                    if nc == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_is_reflexive_for_nonempty_input() {
        let code = "function computeTotal(items) { return items.reduce(sum); }";
        assert_eq!(jaccard_similarity(code, code), 1.0);
    }

    #[test]
    fn jaccard_is_symmetric() {
        let a = "let total = items.map(price).sum();";
        let b = "const total = prices.reduce(add, 0);";
        assert_eq!(jaccard_similarity(a, b), jaccard_similarity(b, a));
    }

    #[test]
    fn jaccard_of_two_empty_snippets_is_zero_not_nan() {
        let s = jaccard_similarity("", "");
        assert_eq!(s, 0.0);
        assert!(!s.is_nan());
    }

    #[test]
    fn jaccard_ignores_comments_and_case() {
        let a = "// computes the cart total\nfunction computeTotal(items) {}";
        let b = "/* legacy */\nFUNCTION COMPUTETOTAL(ITEMS) {}";
        assert_eq!(jaccard_similarity(a, b), 1.0);
    }

    #[test]
    fn jaccard_of_disjoint_snippets_is_zero() {
        assert_eq!(jaccard_similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn single_char_tokens_are_dropped() {
        // `a`, `b`, `x`, `y` are too short to count as tokens.
        let a = "a b cd";
        let b = "x y cd";
        assert_eq!(jaccard_similarity(a, b), 1.0);
    }
}
