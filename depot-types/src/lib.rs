//! Core type definitions for depot.
//!
//! This crate defines the storage-agnostic types shared by the store, the
//! sync engine and the HTTP service:
//! - Version timestamps and document identifiers
//! - Version records and sync summaries
//! - Index definitions, operators and the index value encoding
//! - JSON path resolution and wildcard patterns used by search

mod encoding;
mod ids;
mod index;
pub mod path;
pub mod pattern;
mod stamp;
mod version;

pub use encoding::IndexValue;
pub use ids::{validate_name, DocId};
pub use index::{IndexDefinition, IndexKey, Operand, Operator};
pub use stamp::Stamp;
pub use version::{BinSummary, SummaryEntry, SyncSummary, VersionRecord, VersionStatus};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },

    #[error("invalid index definition: {0}")]
    InvalidDefinition(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),
}
