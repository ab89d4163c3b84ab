//! Ranking, deduplication, and query-building helpers for the scan pipeline.

use std::cmp::Ordering;
use std::collections::HashSet;

use pattern_store::Pattern;

use crate::github::CodeSearchHit;

/// A pattern with its query-relative similarity attached.
///
/// The score is transient: it belongs to this query only and is never
/// persisted with the pattern.
#[derive(Debug, Clone)]
pub struct ScoredPattern {
    pub pattern: Pattern,
    pub similarity: f64,
}

/// Builds up to `max_queries` remote search queries from extracted features,
/// each qualified by language.
pub fn build_search_queries(features: &[String], language: &str, max_queries: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .filter(|f| seen.insert(f.to_lowercase()))
        .take(max_queries)
        .map(|f| format!("{f} language:{}", language.trim()))
        .collect()
}

/// Deduplicates raw search hits by source URL, keeping the first occurrence.
pub fn dedup_hits_by_url(hits: Vec<CodeSearchHit>) -> Vec<CodeSearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|h| seen.insert(h.html_url.clone()))
        .collect()
}

/// Sorts scored patterns by similarity, best first. Ties keep input order.
pub fn sort_by_similarity(results: &mut [ScoredPattern]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
}

/// Merges local and remote results into one ranked list.
///
/// Union deduplicated by `pattern_id`; local results win on collision.
/// The merged list is re-sorted by similarity and capped at `max_results`.
pub fn merge_ranked(
    local: Vec<ScoredPattern>,
    remote: Vec<ScoredPattern>,
    max_results: usize,
) -> Vec<ScoredPattern> {
    let mut seen: HashSet<String> = local
        .iter()
        .map(|s| s.pattern.pattern_id.clone())
        .collect();

    let mut merged = local;
    for s in remote {
        if seen.insert(s.pattern.pattern_id.clone()) {
            merged.push(s);
        }
    }

    sort_by_similarity(&mut merged);
    merged.truncate(max_results);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pattern_store::Complexity;

    fn pattern(id_url: &str, similarity: f64) -> ScoredPattern {
        ScoredPattern {
            pattern: Pattern {
                pattern_id: Pattern::derive_id("javascript", id_url),
                language: "javascript".into(),
                source_repository: "acme/shop".into(),
                source_path: "src/x.js".into(),
                source_url: id_url.into(),
                code_snippet: "function x() {}".into(),
                primary_feature: "x".into(),
                all_features: vec![],
                code_type: "function".into(),
                complexity: Complexity::Medium,
                related_issues: vec![],
                date_added: Utc::now(),
            },
            similarity,
        }
    }

    fn hit(url: &str) -> CodeSearchHit {
        CodeSearchHit {
            repository: "acme/shop".into(),
            path: "src/x.js".into(),
            html_url: url.into(),
        }
    }

    #[test]
    fn queries_are_capped_and_qualified() {
        let features = vec![
            "computeTotal".to_string(),
            "applyDiscount".to_string(),
            "computetotal".to_string(), // case-duplicate, skipped
            "roundPrice".to_string(),
            "fifth".to_string(),
        ];
        let q = build_search_queries(&features, "JavaScript", 3);
        assert_eq!(q.len(), 3);
        assert_eq!(q[0], "computeTotal language:JavaScript");
        assert!(q.iter().all(|s| s.contains("language:JavaScript")));
        assert!(!q.iter().any(|s| s.starts_with("fifth")));
    }

    #[test]
    fn empty_features_build_no_queries() {
        assert!(build_search_queries(&[], "rust", 3).is_empty());
    }

    #[test]
    fn duplicate_urls_keep_exactly_one_hit() {
        let hits = vec![hit("https://a"), hit("https://b"), hit("https://a")];
        let deduped = dedup_hits_by_url(hits);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].html_url, "https://a");
    }

    #[test]
    fn merge_prefers_local_on_collision() {
        let local = vec![pattern("https://a", 0.85)];
        // Same source URL → same pattern_id, different score.
        let remote = vec![pattern("https://a", 0.65), pattern("https://b", 0.75)];

        let merged = merge_ranked(local, remote, 5);
        assert_eq!(merged.len(), 2);

        let a = merged
            .iter()
            .find(|s| s.pattern.source_url == "https://a")
            .unwrap();
        assert_eq!(a.similarity, 0.85);
    }

    #[test]
    fn merge_sorts_descending_and_caps() {
        let local = vec![pattern("https://a", 0.71)];
        let remote = vec![
            pattern("https://b", 0.99),
            pattern("https://c", 0.61),
            pattern("https://d", 0.8),
            pattern("https://e", 0.62),
            pattern("https://f", 0.63),
            pattern("https://g", 0.64),
        ];

        let merged = merge_ranked(local, remote, 5);
        assert_eq!(merged.len(), 5);
        for w in merged.windows(2) {
            assert!(w[0].similarity >= w[1].similarity);
        }
        assert_eq!(merged[0].pattern.source_url, "https://b");
    }
}
