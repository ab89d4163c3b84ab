//! Tuning knobs for the scan pipeline.
//!
//! The cutoffs and caps here mirror the behavior the pipeline was tuned with;
//! they are policy constants, not semantic requirements, so they stay
//! env-overridable rather than hard-coded at call sites.

use tracing::debug;

/// Policy constants controlling the two-tier search.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// Minimum similarity for a locally stored pattern to count as a match.
    pub local_score_cutoff: f64,
    /// Minimum similarity for a remote candidate to be kept.
    pub remote_score_cutoff: f64,
    /// Local match count at which remote search is skipped entirely.
    pub local_short_circuit: usize,
    /// Cap on ranked results per stage and on the final merged list.
    pub max_results: usize,
    /// Cap on remote search queries per scan (rate-limit budget).
    pub max_search_queries: usize,
    /// Cap on enrichment fetches per scan (rate-limit budget).
    pub max_enrich: usize,
    /// Fan-out width for concurrent similarity scoring.
    pub score_concurrency: usize,
    /// Per-snippet character bound for oracle prompts (fallbacks see full input).
    pub oracle_snippet_chars: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            local_score_cutoff: 0.7,
            remote_score_cutoff: 0.6,
            local_short_circuit: 3,
            max_results: 5,
            max_search_queries: 3,
            max_enrich: 10,
            score_concurrency: 4,
            oracle_snippet_chars: 4000,
        }
    }
}

impl ScanPolicy {
    /// Builds the policy from environment variables, falling back to the
    /// defaults above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let d = Self::default();
        let policy = Self {
            local_score_cutoff: env_f64("SCAN_LOCAL_SCORE_CUTOFF", d.local_score_cutoff),
            remote_score_cutoff: env_f64("SCAN_REMOTE_SCORE_CUTOFF", d.remote_score_cutoff),
            local_short_circuit: env_usize("SCAN_LOCAL_SHORT_CIRCUIT", d.local_short_circuit),
            max_results: env_usize("SCAN_MAX_RESULTS", d.max_results),
            max_search_queries: env_usize("SCAN_MAX_SEARCH_QUERIES", d.max_search_queries),
            max_enrich: env_usize("SCAN_MAX_ENRICH", d.max_enrich),
            score_concurrency: env_usize("SCAN_SCORE_CONCURRENCY", d.score_concurrency),
            oracle_snippet_chars: env_usize("SCAN_ORACLE_SNIPPET_CHARS", d.oracle_snippet_chars),
        };
        debug!(?policy, "scan policy resolved");
        policy
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let p = ScanPolicy::default();
        assert_eq!(p.local_score_cutoff, 0.7);
        assert_eq!(p.remote_score_cutoff, 0.6);
        assert_eq!(p.local_short_circuit, 3);
        assert_eq!(p.max_results, 5);
        assert_eq!(p.max_search_queries, 3);
        assert_eq!(p.max_enrich, 10);
    }
}
