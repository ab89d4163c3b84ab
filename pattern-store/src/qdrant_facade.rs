//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! This facade concentrates all Qdrant interactions behind a minimal API,
//! hiding away the verbose builder pattern and keeping the rest of the
//! application decoupled from `qdrant-client`.
//!
//! The collection holds payload-only points (no dense vectors): retrieval is
//! by payload filter, and identity is carried by deterministic UUIDv5 point
//! ids.

use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::errors::StoreError;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Filter, GetPointsBuilder, PointId, PointStruct, ScrollPointsBuilder,
    UpsertPointsBuilder, Value as QValue,
};
use tracing::{debug, info, warn};

/// A facade over the Qdrant client to keep the rest of the code clean and stable.
pub struct QdrantFacade {
    client: Qdrant,
    pub(crate) collection: String,
    query_limit: u32,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    ///
    /// Uses the builder-based API of `qdrant-client` and supports optional
    /// API key authentication.
    pub fn new(cfg: &StoreConfig) -> Result<Self, StoreError> {
        cfg.validate()?; // Early validation of config.

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            query_limit: cfg.query_limit,
        })
    }

    /// Ensures that the collection exists in Qdrant.
    ///
    /// - If the collection already exists → no-op.
    /// - If missing → creates it (payload-only, no vector config).
    ///
    /// Safe to call on every process startup.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        info!("Ensuring collection '{}'", self.collection);

        // Try to fetch collection info first.
        match self.client.collection_info(&self.collection).await {
            Ok(_) => {
                debug!("Collection '{}' already exists", self.collection);
                return Ok(());
            }
            Err(err) => {
                warn!(
                    "Collection '{}' not found, will be created (error={})",
                    self.collection, err
                );
            }
        }

        self.client
            .create_collection(CreateCollectionBuilder::new(&self.collection))
            .await
            .map_err(|e| StoreError::Qdrant(e.to_string()))?;

        info!("Collection '{}' created successfully", self.collection);
        Ok(())
    }

    /// Returns whether a point with the given id already exists.
    pub async fn point_exists(&self, point_id: &str) -> Result<bool, StoreError> {
        let ids: Vec<PointId> = vec![point_id.to_string().into()];
        let res = self
            .client
            .get_points(GetPointsBuilder::new(&self.collection, ids))
            .await
            .map_err(|e| StoreError::Qdrant(e.to_string()))?;
        Ok(!res.result.is_empty())
    }

    /// Writes a single payload-only point.
    pub async fn upsert_point(
        &self,
        point_id: &str,
        payload: HashMap<String, QValue>,
    ) -> Result<(), StoreError> {
        debug!(
            "Upserting point {} into collection '{}'",
            point_id, self.collection
        );

        let point = PointStruct {
            id: Some(point_id.to_string().into()),
            payload,
            vectors: None,
        };

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| StoreError::Qdrant(e.to_string()))?;

        Ok(())
    }

    /// Returns payloads of points matching the filter, up to the configured
    /// query limit. No ordering guarantee; callers re-score and sort.
    pub async fn scroll_payloads(
        &self,
        filter: Filter,
    ) -> Result<Vec<HashMap<String, QValue>>, StoreError> {
        debug!(
            "Scrolling collection '{}' (limit={})",
            self.collection, self.query_limit
        );

        let res = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .filter(filter)
                    .limit(self.query_limit)
                    .with_payload(true),
            )
            .await
            .map_err(|e| StoreError::Qdrant(e.to_string()))?;

        debug!("Scroll returned {} points", res.result.len());
        Ok(res.result.into_iter().map(|p| p.payload).collect())
    }
}
