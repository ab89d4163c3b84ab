//! Core data models used by the library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Rough complexity bucket reported by the extractor. Informational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    /// Lenient parse from free-form oracle output (`"High"`, `"low"`, ...).
    /// Unknown strings map to `Medium`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Complexity::Low,
            "high" => Complexity::High,
            _ => Complexity::Medium,
        }
    }
}

/// Issue-tracker entry linked to a discovered pattern.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RelatedIssue {
    pub title: String,
    pub url: String,
    pub state: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A previously seen code snippet plus provenance and extracted metadata.
///
/// Persisted once at discovery time and never updated afterwards; the
/// `code_snippet` is a point-in-time capture with no freshness guarantee.
/// Similarity scores are query-relative and deliberately NOT part of this
/// record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pattern {
    /// Deterministic identity: `"{language}-{sha256(source_url)[..16]}"`.
    pub pattern_id: String,
    /// Partition key (lower-cased).
    pub language: String,
    pub source_repository: String,
    pub source_path: String,
    pub source_url: String,
    pub code_snippet: String,
    /// Most salient extracted feature; coarse secondary grouping key.
    pub primary_feature: String,
    /// All extracted features, in extraction order.
    pub all_features: Vec<String>,
    pub code_type: String,
    pub complexity: Complexity,
    #[serde(default)]
    pub related_issues: Vec<RelatedIssue>,
    /// Set once at creation, never updated.
    pub date_added: DateTime<Utc>,
}

impl Pattern {
    /// Derives the deterministic pattern identity from language + source URL.
    ///
    /// First-discovered snippet for a given source URL wins permanently:
    /// every later discovery of the same URL maps to the same id.
    pub fn derive_id(language: &str, source_url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_url.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        format!("{}-{}", language.trim().to_lowercase(), &digest[..16])
    }

    /// Deterministic store point id (UUIDv5 over the pattern id).
    ///
    /// Concurrent create attempts for the same pattern therefore target the
    /// same point, so a lost race degenerates into an idempotent rewrite of
    /// identical content rather than a duplicate record.
    pub fn point_id(&self) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, self.pattern_id.as_bytes()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_id_is_deterministic_and_language_scoped() {
        let a = Pattern::derive_id("JavaScript", "https://github.com/x/y/blob/main/a.js");
        let b = Pattern::derive_id("JavaScript", "https://github.com/x/y/blob/main/a.js");
        let c = Pattern::derive_id("JavaScript", "https://github.com/x/y/blob/main/b.js");
        let d = Pattern::derive_id("Python", "https://github.com/x/y/blob/main/a.js");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with("javascript-"));
    }

    #[test]
    fn complexity_parses_leniently() {
        assert_eq!(Complexity::parse_lenient("High"), Complexity::High);
        assert_eq!(Complexity::parse_lenient(" low "), Complexity::Low);
        assert_eq!(Complexity::parse_lenient("???"), Complexity::Medium);
    }

    #[test]
    fn pattern_round_trips_through_json() {
        let p = Pattern {
            pattern_id: Pattern::derive_id("rust", "https://example.com/a.rs"),
            language: "rust".into(),
            source_repository: "x/y".into(),
            source_path: "src/a.rs".into(),
            source_url: "https://example.com/a.rs".into(),
            code_snippet: "fn main() {}".into(),
            primary_feature: "main".into(),
            all_features: vec!["main".into()],
            code_type: "function".into(),
            complexity: Complexity::Low,
            related_issues: vec![],
            date_added: Utc::now(),
        };
        let v = serde_json::to_value(&p).unwrap();
        let back: Pattern = serde_json::from_value(v).unwrap();
        assert_eq!(back.pattern_id, p.pattern_id);
        assert_eq!(back.complexity, Complexity::Low);
    }
}
