//! Error types for the shape store.

use crate::types::ShapeId;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate shape id: {0}")]
    DuplicateId(ShapeId),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Persistence failed for key {key}: {source}")]
    Persistence {
        key: String,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid stored state: {0}")]
    InvalidFormat(String),

    #[error("Storage slot is locked by another process")]
    Locked,
}

impl StoreError {
    /// Wrap a slot or encoding failure as a persistence failure for `key`.
    pub(crate) fn persistence(key: &str, source: StoreError) -> Self {
        StoreError::Persistence {
            key: key.to_string(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
