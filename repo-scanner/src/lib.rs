//! Public entry for the repository scanner pipeline.
//!
//! Single high-level type to find previously seen similar code for a snippet.
//!
//! 1) **Local lookup**
//!    - Extract features (oracle, falling back to the regex extractor)
//!    - Query the pattern store by language + primary-feature match
//!    - Score each stored pattern against the input, keep high-confidence
//!      matches, and short-circuit when there are enough of them
//!
//! 2) **Remote search** (only when local matches are insufficient)
//!    - Build a bounded set of code-index queries from the top features
//!    - Execute them sequentially (search endpoints are rate-limited),
//!      deduplicate raw hits by source URL
//!
//! 3) **Enrich + score**
//!    - Fetch full content and related issues for a bounded number of hits
//!      (a hit that fails to fetch is dropped, not fatal)
//!    - Score candidates against the input, keep the confident ones, convert
//!      them into pattern records
//!
//! 4) **Merge + persist**
//!    - Union with local results, deduplicated by pattern identity with
//!      local priority; best-effort write-back of newly discovered patterns
//!
//! The pipeline never raises past its own boundary: every stage degrades to
//! an empty contribution on failure and the caller always receives a
//! (possibly empty) ranked list. Failure detail goes to `tracing` only.
//!
//! The pipeline uses plain `async fn` over thin generic seams (oracle, code
//! index, pattern index) — no `async-trait`, no heap trait objects. A
//! caller-supplied cancellation token is honored between stages.

pub mod errors;
pub mod features;
pub mod github;
pub mod oracle;
pub mod policy;
pub mod prompts;
pub mod rank;
pub mod similarity;

pub use errors::{Error, ProviderError, ScanResult};
pub use features::{CodeFeatures, extract_features, fallback_features};
pub use github::{CodeIndex, CodeSearchHit, GitHubCodeIndex};
pub use oracle::CodeOracle;
pub use policy::ScanPolicy;
pub use rank::ScoredPattern;
pub use similarity::{jaccard_similarity, score_similarity};

use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pattern_store::{Pattern, PatternStore, StoreError};

use rank::{build_search_queries, dedup_hits_by_url, merge_ranked, sort_by_similarity};

/// One scan invocation: the snippet, its language, and an optional
/// cancellation token checked at stage boundaries.
pub struct ScanRequest<'a> {
    pub code: &'a str,
    pub language: &'a str,
    pub cancel: Option<CancellationToken>,
}

impl<'a> ScanRequest<'a> {
    pub fn new(code: &'a str, language: &'a str) -> Self {
        Self {
            code,
            language,
            cancel: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

/// Capability interface over the pattern store.
///
/// Mirrors the store's two operations so orchestrator tests can run against
/// an in-memory implementation; production code plugs in [`PatternStore`].
pub trait PatternIndex {
    fn query_by_language_and_features(
        &self,
        language: &str,
        features: &[String],
    ) -> impl Future<Output = Result<Vec<Pattern>, StoreError>> + Send;

    fn insert_if_absent(
        &self,
        pattern: &Pattern,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl PatternIndex for PatternStore {
    async fn query_by_language_and_features(
        &self,
        language: &str,
        features: &[String],
    ) -> Result<Vec<Pattern>, StoreError> {
        PatternStore::query_by_language_and_features(self, language, features).await
    }

    async fn insert_if_absent(&self, pattern: &Pattern) -> Result<bool, StoreError> {
        PatternStore::insert_if_absent(self, pattern).await
    }
}

/// A search hit with its fetched content and related issues.
struct EnrichedHit {
    hit: CodeSearchHit,
    content: String,
    issues: Vec<pattern_store::RelatedIssue>,
}

/// The cross-repository similar-code scanner.
///
/// Construct once with long-lived service objects (the oracle client, the
/// code index client, and the shared pattern store) and call
/// [`RepoScanner::find_similar_patterns`] per snippet.
pub struct RepoScanner<O, I, S> {
    oracle: O,
    index: I,
    store: S,
    policy: ScanPolicy,
}

impl<O, I, S> RepoScanner<O, I, S>
where
    O: CodeOracle + Sync,
    I: CodeIndex + Sync,
    S: PatternIndex + Sync,
{
    pub fn new(oracle: O, index: I, store: S, policy: ScanPolicy) -> Self {
        Self {
            oracle,
            index,
            store,
            policy,
        }
    }

    /// Runs the full two-tier search for one snippet.
    ///
    /// Always returns a (possibly empty) list ranked by similarity, best
    /// first. Nothing here fails past this boundary; degraded stages are
    /// visible only in logs.
    pub async fn find_similar_patterns(&self, req: ScanRequest<'_>) -> Vec<ScoredPattern> {
        let t0 = Instant::now();

        if req.code.trim().is_empty() {
            debug!("scan: empty snippet, nothing to do");
            return Vec::new();
        }

        // ---------------------------
        // Stage 1: local lookup
        // ---------------------------
        debug!("scan: extract features");
        let feats = extract_features(
            &self.oracle,
            req.code,
            req.language,
            self.policy.oracle_snippet_chars,
        )
        .await;
        debug!(
            "scan: features ready, primary={}, total={}",
            feats.primary().unwrap_or("<none>"),
            feats.all().len()
        );

        let local = self.local_lookup(&req, &feats).await;
        debug!(
            "scan: local lookup done, matches={} ({} ms)",
            local.len(),
            t0.elapsed().as_millis()
        );

        if local.len() >= self.policy.local_short_circuit {
            debug!(
                "scan: short-circuit on {} local matches, remote search skipped",
                local.len()
            );
            return local;
        }

        if req.is_cancelled() {
            debug!("scan: cancelled after local lookup");
            return local;
        }

        // ---------------------------
        // Stage 2: remote search
        // ---------------------------
        let hits = self.remote_search(&req, &feats).await;
        debug!(
            "scan: remote search done, hits={} ({} ms)",
            hits.len(),
            t0.elapsed().as_millis()
        );

        if req.is_cancelled() {
            debug!("scan: cancelled after remote search");
            return local;
        }

        // ---------------------------
        // Stage 3: enrich + score
        // ---------------------------
        let enriched = self.enrich(hits).await;
        debug!("scan: enriched candidates={}", enriched.len());

        if req.is_cancelled() {
            debug!("scan: cancelled after enrichment");
            return local;
        }

        let remote = self.score_remote(&req, enriched).await;
        debug!(
            "scan: remote scoring done, kept={} ({} ms)",
            remote.len(),
            t0.elapsed().as_millis()
        );

        // ---------------------------
        // Stage 4: merge + persist
        // ---------------------------
        self.persist(&remote).await;

        let merged = merge_ranked(local, remote, self.policy.max_results);
        debug!(
            "scan: done, results={} ({} ms)",
            merged.len(),
            t0.elapsed().as_millis()
        );
        merged
    }

    /// Queries the store and keeps high-confidence matches, sorted and capped.
    async fn local_lookup(&self, req: &ScanRequest<'_>, feats: &CodeFeatures) -> Vec<ScoredPattern> {
        let stored = match self
            .store
            .query_by_language_and_features(req.language, &feats.all())
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!("local lookup failed, treating as no matches: {e}");
                return Vec::new();
            }
        };

        let mut scored: Vec<ScoredPattern> = stream::iter(stored.into_iter().map(|p| {
            let oracle = &self.oracle;
            async move {
                let similarity = score_similarity(
                    oracle,
                    req.code,
                    &p.code_snippet,
                    self.policy.oracle_snippet_chars,
                )
                .await;
                ScoredPattern {
                    pattern: p,
                    similarity,
                }
            }
        }))
        .buffer_unordered(self.policy.score_concurrency.max(1))
        .filter(|s| futures::future::ready(s.similarity > self.policy.local_score_cutoff))
        .collect()
        .await;

        sort_by_similarity(&mut scored);
        scored.truncate(self.policy.max_results);
        scored
    }

    /// Executes bounded sequential code-index queries; failures contribute
    /// nothing. Hits are deduplicated by URL and capped for enrichment.
    async fn remote_search(&self, req: &ScanRequest<'_>, feats: &CodeFeatures) -> Vec<CodeSearchHit> {
        let queries = build_search_queries(
            &feats.all(),
            req.language,
            self.policy.max_search_queries,
        );
        if queries.is_empty() {
            debug!("remote search skipped: no usable features");
            return Vec::new();
        }

        let mut hits = Vec::new();
        for query in &queries {
            match self.index.search_code(query).await {
                Ok(mut batch) => hits.append(&mut batch),
                Err(e) => warn!(%query, "code search failed, skipping query: {e}"),
            }
        }

        let mut deduped = dedup_hits_by_url(hits);
        deduped.truncate(self.policy.max_enrich);
        deduped
    }

    /// Fetches content and related issues per hit; a failed fetch drops the
    /// hit silently (logged), a failed issue search yields an empty list.
    async fn enrich(&self, hits: Vec<CodeSearchHit>) -> Vec<EnrichedHit> {
        stream::iter(hits.into_iter().map(|hit| {
            let index = &self.index;
            async move {
                let content = match index.fetch_content(&hit.repository, &hit.path).await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(url = %hit.html_url, "content fetch failed, dropping hit: {e}");
                        return None;
                    }
                };
                let issues = match index.search_issues(&hit.repository, &hit.path).await {
                    Ok(i) => i,
                    Err(e) => {
                        warn!(url = %hit.html_url, "issue search failed, continuing without: {e}");
                        Vec::new()
                    }
                };
                Some(EnrichedHit {
                    hit,
                    content,
                    issues,
                })
            }
        }))
        .buffer_unordered(self.policy.score_concurrency.max(1))
        .filter_map(futures::future::ready)
        .collect()
        .await
    }

    /// Scores enriched hits, keeps confident candidates, and converts them
    /// into pattern records (features extracted from the remote content).
    async fn score_remote(
        &self,
        req: &ScanRequest<'_>,
        enriched: Vec<EnrichedHit>,
    ) -> Vec<ScoredPattern> {
        let mut scored: Vec<(EnrichedHit, f64)> = stream::iter(enriched.into_iter().map(|e| {
            let oracle = &self.oracle;
            async move {
                let similarity = score_similarity(
                    oracle,
                    req.code,
                    &e.content,
                    self.policy.oracle_snippet_chars,
                )
                .await;
                (e, similarity)
            }
        }))
        .buffer_unordered(self.policy.score_concurrency.max(1))
        .filter(|(_, s)| futures::future::ready(*s > self.policy.remote_score_cutoff))
        .collect()
        .await;

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.policy.max_results);

        let mut out = Vec::with_capacity(scored.len());
        for (e, similarity) in scored {
            let feats = extract_features(
                &self.oracle,
                &e.content,
                req.language,
                self.policy.oracle_snippet_chars,
            )
            .await;

            out.push(ScoredPattern {
                pattern: Pattern {
                    pattern_id: Pattern::derive_id(req.language, &e.hit.html_url),
                    language: req.language.trim().to_lowercase(),
                    source_repository: e.hit.repository,
                    source_path: e.hit.path,
                    source_url: e.hit.html_url,
                    code_snippet: e.content,
                    primary_feature: feats.primary().unwrap_or_default().to_string(),
                    all_features: feats.all(),
                    code_type: feats.code_type,
                    complexity: feats.complexity,
                    related_issues: e.issues,
                    date_added: Utc::now(),
                },
                similarity,
            });
        }
        out
    }

    /// Best-effort write-back of newly discovered patterns. A failed write
    /// only means the pattern is not cached for next time.
    async fn persist(&self, remote: &[ScoredPattern]) {
        for s in remote {
            match self.store.insert_if_absent(&s.pattern).await {
                Ok(true) => debug!("persisted new pattern {}", s.pattern.pattern_id),
                Ok(false) => debug!("pattern {} already stored", s.pattern.pattern_id),
                Err(e) => warn!(
                    "failed to persist pattern {}: {e}",
                    s.pattern.pattern_id
                ),
            }
        }
    }
}
