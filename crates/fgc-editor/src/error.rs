//! Error types for backend calls, the node store and image loading.

use fgc_core::NodeId;

/// A rejected or failed call to the canvas backend.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend rejected the request with status {status}")]
    Rejected { status: u16 },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("delete of {0} is already in flight")]
    DeleteInFlight(NodeId),
    #[error("backend did not confirm delete of {0}")]
    DeleteNotConfirmed(NodeId),
    #[error("no stage is open")]
    NoStage,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("image {src} could not be decoded: {reason}")]
    Decode { src: String, reason: String },
}
