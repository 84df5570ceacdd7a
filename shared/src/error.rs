//! Errors at the content, codec and store boundaries.

use thiserror::Error;

/// Failure to read a `"x, y, z"` vector string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVec3Error {
    #[error("expected 3 components, found {found} in {input:?}")]
    ComponentCount { input: String, found: usize },
    #[error("component {index} of {input:?} is not a finite number")]
    InvalidComponent { input: String, index: usize },
}

/// Failure to load streamed area content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("area content {path} could not be read: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("area content {path} is malformed: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no area is registered for {0:?}")]
    UnknownLocation(String),
}

/// Failure reported by a presence store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("presence record {0} does not exist")]
    NotFound(String),
    #[error("presence store rejected the write: {0}")]
    Rejected(String),
}
