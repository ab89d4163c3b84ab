//! Feature extraction: oracle-backed primary path + deterministic fallback.
//!
//! A feature is a salient identifier (function/class name, imported module)
//! usable as a coarse search key. The oracle path asks the LLM for a
//! structured JSON payload; any failure — transport, timeout, unparseable
//! body, missing fields — drops to a regex extractor that never fails (worst
//! case: empty feature list).

use lazy_static::lazy_static;
use oracle_service::OracleError;
use pattern_store::Complexity;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::oracle::{CodeOracle, extract_json_object};
use crate::prompts;

/// Minimum length for a fallback feature token.
const MIN_FEATURE_LEN: usize = 4;
/// Cap on features returned by the fallback extractor.
const MAX_FALLBACK_FEATURES: usize = 5;

/// Extracted features for one snippet.
#[derive(Debug, Clone, Default)]
pub struct CodeFeatures {
    /// Most salient identifiers, best first.
    pub primary_features: Vec<String>,
    /// Supporting identifiers (APIs used, imports, helpers).
    pub secondary_features: Vec<String>,
    /// Categorical label ("function", "class", "module", "unknown", ...).
    pub code_type: String,
    pub complexity: Complexity,
}

impl CodeFeatures {
    /// The single most salient feature, if any.
    pub fn primary(&self) -> Option<&str> {
        self.primary_features.first().map(String::as_str)
    }

    /// Primary + secondary features in order, primary first.
    pub fn all(&self) -> Vec<String> {
        let mut out = self.primary_features.clone();
        out.extend(self.secondary_features.iter().cloned());
        out
    }
}

/// Oracle response schema for feature extraction (camelCase per the prompt).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeaturePayload {
    primary_features: Vec<String>,
    #[serde(default)]
    secondary_features: Vec<String>,
    #[serde(default)]
    code_type: Option<String>,
    #[serde(default)]
    complexity: Option<String>,
}

/// Extracts features for a snippet. Never fails.
///
/// Primary path delegates to the oracle with a bounded prompt; on any
/// failure the deterministic regex extractor takes over. An empty snippet
/// yields empty features without an oracle call.
pub async fn extract_features<O: CodeOracle>(
    oracle: &O,
    code: &str,
    language: &str,
    snippet_chars: usize,
) -> CodeFeatures {
    if code.trim().is_empty() {
        return CodeFeatures {
            code_type: "unknown".into(),
            ..Default::default()
        };
    }

    match oracle_features(oracle, code, language, snippet_chars).await {
        Ok(f) => f,
        Err(e) => {
            warn!("oracle feature extraction failed, using fallback: {e}");
            fallback_features(code)
        }
    }
}

async fn oracle_features<O: CodeOracle>(
    oracle: &O,
    code: &str,
    language: &str,
    snippet_chars: usize,
) -> Result<CodeFeatures, OracleError> {
    let prompt = prompts::feature_prompt(code, language, snippet_chars);
    let raw = oracle
        .complete_json(prompts::FEATURE_SYSTEM, &prompt)
        .await?;

    let json = extract_json_object(&raw).ok_or_else(|| {
        OracleError::Request(oracle_service::RequestError::Decode(
            "no JSON object in feature response".into(),
        ))
    })?;

    let payload: FeaturePayload = serde_json::from_value(json).map_err(|e| {
        OracleError::Request(oracle_service::RequestError::Decode(format!(
            "feature schema mismatch: {e}"
        )))
    })?;

    let primary_features: Vec<String> = payload
        .primary_features
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    debug!(
        primary = primary_features.len(),
        secondary = payload.secondary_features.len(),
        "oracle features extracted"
    );

    Ok(CodeFeatures {
        primary_features,
        secondary_features: payload.secondary_features,
        code_type: payload.code_type.unwrap_or_else(|| "unknown".into()),
        complexity: payload
            .complexity
            .as_deref()
            .map(Complexity::parse_lenient)
            .unwrap_or_default(),
    })
}

/// Deterministic regex extractor: declaration names and imported modules.
///
/// Returns at most [`MAX_FALLBACK_FEATURES`] features, each at least
/// [`MIN_FEATURE_LEN`] characters, with `code_type = "unknown"` and medium
/// complexity. This path must never fail.
pub fn fallback_features(code: &str) -> CodeFeatures {
    lazy_static! {
        // `function computeTotal(`, `fn tokenize(`, `def load_json(`, `func main(`
        static ref FN_DECL: Regex = Regex::new(
            r"(?m)\b(?:function|fn|def|func)\s+([A-Za-z_][A-Za-z0-9_]*)"
        ).unwrap();
        // `class CartService`, `struct Token`, `interface Store`, `trait Oracle`
        static ref TYPE_DECL: Regex = Regex::new(
            r"(?m)\b(?:class|struct|interface|trait|enum)\s+([A-Za-z_][A-Za-z0-9_]*)"
        ).unwrap();
        // `import foo`, `from foo import`, `use foo::bar`, `#include <foo>`, `require('foo')`
        static ref IMPORT_STMT: Regex = Regex::new(
            r#"(?m)^\s*(?:import|from|use|require|#include)\b[^\n]*?([A-Za-z_][A-Za-z0-9_]*)"#
        ).unwrap();
    }

    let mut features: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if name.len() >= MIN_FEATURE_LEN && !features.iter().any(|f| f == name) {
            features.push(name.to_string());
        }
    };

    for caps in FN_DECL.captures_iter(code) {
        push(&caps[1]);
    }
    for caps in TYPE_DECL.captures_iter(code) {
        push(&caps[1]);
    }
    for caps in IMPORT_STMT.captures_iter(code) {
        push(&caps[1]);
    }

    features.truncate(MAX_FALLBACK_FEATURES);
    debug!(count = features.len(), "fallback features extracted");

    CodeFeatures {
        primary_features: features,
        secondary_features: Vec::new(),
        code_type: "unknown".into(),
        complexity: Complexity::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_finds_function_names() {
        let code = "function computeTotal(items) {\n  return items.length;\n}";
        let f = fallback_features(code);
        assert!(f.primary_features.contains(&"computeTotal".to_string()));
        assert_eq!(f.code_type, "unknown");
        assert_eq!(f.complexity, Complexity::Medium);
    }

    #[test]
    fn fallback_finds_classes_and_imports() {
        let code = "import collections\n\nclass OrderBook:\n    def best_bid(self):\n        pass\n";
        let f = fallback_features(code);
        assert!(f.primary_features.contains(&"OrderBook".to_string()));
        assert!(f.primary_features.contains(&"best_bid".to_string()));
        assert!(f.primary_features.contains(&"collections".to_string()));
    }

    #[test]
    fn fallback_respects_length_and_cap() {
        // `ab` is too short to be a useful search key.
        let code = "fn ab() {}\nfn proc_one() {}\nfn proc_two() {}\nfn proc_three() {}\nfn proc_four() {}\nfn proc_five() {}\nfn proc_six() {}";
        let f = fallback_features(code);
        assert!(!f.primary_features.iter().any(|s| s == "ab"));
        assert!(f.primary_features.len() <= 5);
    }

    #[test]
    fn fallback_on_empty_input_is_empty() {
        let f = fallback_features("");
        assert!(f.primary_features.is_empty());
    }

    #[test]
    fn fallback_deduplicates() {
        let code = "fn main() {}\nfn main() {}";
        let f = fallback_features(code);
        assert_eq!(
            f.primary_features
                .iter()
                .filter(|s| s.as_str() == "main")
                .count(),
            1
        );
    }
}
