//! Error types for the sync layer.

use depot_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The peer rejected our credentials. Fatal for the whole run.
    #[error("{peer}: authorization rejected")]
    AuthRejected { peer: String },

    /// The peer answered with a non-success status.
    #[error("{peer}: HTTP {status}: {detail}")]
    Http {
        peer: String,
        status: u16,
        detail: String,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Protocol error (unexpected response shape).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Storage error from a local peer.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// True when the run must stop without further requests.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }
}
