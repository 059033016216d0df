//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No current active version for the document.
    #[error("not found: {bin}/{id}")]
    NotFound { bin: String, id: String },

    /// A search referenced a key the bin does not declare.
    #[error("Not a search key: {0}")]
    InvalidSearchKey(String),

    /// A search tree with no conditions.
    #[error("empty search")]
    EmptySearch,

    /// A search tree that is not shaped as nested mappings.
    #[error("invalid search: {0}")]
    InvalidSearch(String),

    /// An `in_list` key whose path resolved to something other than a list.
    #[error("index key {key}: value at {path:?} is not a list")]
    InvalidPathValue { key: String, path: String },

    /// Malformed index definition, bin name or configuration.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// A JSON patch that could not be parsed or applied.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn not_found(bin: &str, id: &str) -> Self {
        Self::NotFound {
            bin: bin.to_string(),
            id: id.to_string(),
        }
    }

    /// True for failures of the backing store itself rather than of the request.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_) | Self::LockPoisoned)
    }
}

impl From<depot_types::Error> for StorageError {
    fn from(err: depot_types::Error) -> Self {
        match err {
            depot_types::Error::Serialization(e) => Self::Serialization(e),
            other => Self::InvalidDefinition(other.to_string()),
        }
    }
}
