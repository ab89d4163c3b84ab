//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for pattern-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// JSON mapping between `Pattern` and point payload failed.
    #[error("payload mapping error: {0}")]
    Mapping(#[from] serde_json::Error),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),
}
