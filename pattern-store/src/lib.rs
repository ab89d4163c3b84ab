//! Persistent store of previously discovered code patterns.
//!
//! This crate provides a clean API to:
//! - Initialize the backing collection idempotently at startup
//! - Query patterns by language partition + primary-feature match
//! - Create patterns conditionally (`insert_if_absent`), deduplicated by
//!   deterministic pattern identity
//!
//! The design is flat (no deep nesting) and splits responsibilities into
//! focused modules. Patterns are never updated or deleted here; retention is
//! an external concern.

mod config;
mod errors;
mod filters;
mod mappers;
mod qdrant_facade;
mod record;

pub use config::StoreConfig;
pub use errors::StoreError;
pub use record::{Complexity, Pattern, RelatedIssue};

use tracing::{debug, trace, warn};

/// High-level facade that wires configuration and the Qdrant client.
///
/// This is the single entry point recommended for application code.
/// Construct once at startup, call [`PatternStore::init`], wrap in `Arc`,
/// and share across orchestrator invocations.
pub struct PatternStore {
    client: qdrant_facade::QdrantFacade,
}

impl PatternStore {
    /// Constructs a new store from the given configuration.
    ///
    /// # Errors
    /// Returns `StoreError::Config` if validation or client init fails.
    pub fn new(cfg: StoreConfig) -> Result<Self, StoreError> {
        trace!("PatternStore::new collection={}", cfg.collection);
        let client = qdrant_facade::QdrantFacade::new(&cfg)?;
        Ok(Self { client })
    }

    /// Idempotent namespace initialization ("create if not exists").
    ///
    /// Must be called once at process startup; safe to call again. This is
    /// the one operation whose failure is fatal for the subsystem — without
    /// the persistence layer the scanner cannot run its local lookup.
    ///
    /// # Errors
    /// Returns `StoreError::Qdrant` if the collection cannot be ensured.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.client.ensure_collection().await
    }

    /// Returns patterns whose `language` matches and whose `primary_feature`
    /// is contained in the given feature set.
    ///
    /// An empty feature set matches nothing (containment in the empty set is
    /// false) and short-circuits without touching the store; a filter with no
    /// feature condition would otherwise return the whole language partition.
    ///
    /// No ordering guarantee; the caller re-scores against its own query
    /// snippet and sorts. Points whose payload fails to map back into a
    /// [`Pattern`] are skipped with a warning rather than failing the query.
    ///
    /// # Errors
    /// Returns `StoreError::Qdrant` on client failures.
    pub async fn query_by_language_and_features(
        &self,
        language: &str,
        features: &[String],
    ) -> Result<Vec<Pattern>, StoreError> {
        debug!(
            "PatternStore::query language={} features={}",
            language,
            features.len()
        );

        if features.is_empty() {
            debug!("PatternStore::query with no features, nothing can match");
            return Ok(Vec::new());
        }

        let filter = filters::language_and_features_filter(language, features);
        let payloads = self.client.scroll_payloads(filter).await?;

        let mut out = Vec::with_capacity(payloads.len());
        for payload in payloads {
            match mappers::payload_to_pattern(payload) {
                Ok(p) => out.push(p),
                Err(e) => warn!("skipping malformed pattern payload: {e}"),
            }
        }

        debug!("PatternStore::query returned {} patterns", out.len());
        Ok(out)
    }

    /// Creates the pattern only if no record with the same identity exists.
    ///
    /// Returns `true` when a new record was written, `false` when an existing
    /// record was left untouched. The check-then-create race is benign: the
    /// point id is a deterministic function of `pattern_id`, so a concurrent
    /// writer targets the same point and the store collapses the two writes
    /// into one record.
    ///
    /// # Errors
    /// Returns `StoreError::Qdrant` on client failures, `StoreError::Mapping`
    /// if the record cannot be serialized.
    pub async fn insert_if_absent(&self, pattern: &Pattern) -> Result<bool, StoreError> {
        let point_id = pattern.point_id();

        if self.client.point_exists(&point_id).await? {
            debug!(
                "pattern {} already stored, skipping write",
                pattern.pattern_id
            );
            return Ok(false);
        }

        let payload = mappers::pattern_to_payload(pattern)?;
        self.client.upsert_point(&point_id, payload).await?;
        debug!("pattern {} stored", pattern.pattern_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Client construction is lazy, so no Qdrant instance is contacted here.
    #[tokio::test]
    async fn empty_feature_set_matches_nothing() {
        let store = PatternStore::new(StoreConfig::new_default(
            "http://localhost:6334",
            "patterns_test",
        ))
        .unwrap();

        let out = store
            .query_by_language_and_features("rust", &[])
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
