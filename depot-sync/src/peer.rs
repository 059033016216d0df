//! The contract a depot instance exposes to the sync engine.
//!
//! Implemented over HTTP by [`HttpPeer`](crate::HttpPeer) and in-process by
//! [`LocalPeer`](crate::LocalPeer).

use crate::error::SyncResult;
use async_trait::async_trait;
use depot_types::{IndexDefinition, Stamp, SyncSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Current items of a bin together with its index definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub items: BTreeMap<String, Value>,
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexDefinition>,
}

impl ItemList {
    #[must_use]
    pub fn new(items: BTreeMap<String, Value>, index: Option<IndexDefinition>) -> Self {
        Self {
            count: items.len(),
            items,
            index,
        }
    }
}

/// One side of a sync run.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Latest-version metadata for every document, or for one bin.
    async fn summary(&self, bin: Option<&str>) -> SyncResult<SyncSummary>;

    /// Current active items of `bin` with its index definition.
    async fn list_items(&self, bin: &str) -> SyncResult<ItemList>;

    /// Current content of `bin/id`; `None` when it has no active version.
    async fn get_item(&self, bin: &str, id: &str) -> SyncResult<Option<Value>>;

    /// Writes `content` as a version stamped `stamp`.
    async fn put_item(&self, bin: &str, id: &str, content: &Value, stamp: Stamp) -> SyncResult<()>;

    /// Records a deletion stamped `stamp`.
    async fn delete_item(&self, bin: &str, id: &str, stamp: Stamp) -> SyncResult<()>;

    /// Replaces the index definition of `bin`.
    async fn put_index(&self, bin: &str, def: &IndexDefinition) -> SyncResult<()>;

    /// Purges versions older than `days` days across all bins. Returns the
    /// number of versions removed.
    async fn cleanup(&self, days: u32) -> SyncResult<usize>;
}
