//! SQLite storage layer for depot.
//!
//! Provides persistent, versioned storage for JSON documents grouped into
//! bins.
//!
//! # Architecture
//!
//! - Every write appends a version; the newest version of a document is its
//!   current state, and a tombstone version marks a deletion
//! - Per-bin index definitions extract values from document content into
//!   materialized index entries, refreshed in the same transaction as the
//!   write that changes a document
//! - Searches compile to a predicate tree evaluated over those entries
//! - Retention removes superseded versions and old tombstones
//! - Schema migrations are handled automatically on open

mod config;
mod error;
mod index;
mod query;
mod retention;
mod schema;
mod store;

pub use config::{BinConfig, BinConfigCache};
pub use error::{StorageError, StorageResult};
pub use query::{tree_from_pairs, CompiledQuery, Predicate};
pub use schema::SCHEMA_VERSION;
pub use store::Store;
