//! A peer backed by a store in the same process.

use crate::error::{SyncError, SyncResult};
use crate::peer::{ItemList, Peer};
use async_trait::async_trait;
use depot_storage::{StorageError, StorageResult, Store};
use depot_types::{IndexDefinition, Stamp, SyncSummary};
use serde_json::Value;
use std::sync::Arc;

/// Peer that calls a [`Store`] directly on the blocking thread pool.
pub struct LocalPeer {
    name: String,
    store: Arc<Store>,
}

impl LocalPeer {
    pub fn new(name: impl Into<String>, store: Arc<Store>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    async fn blocking<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&Store) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
            .map_err(SyncError::from)
    }
}

#[async_trait]
impl Peer for LocalPeer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn summary(&self, bin: Option<&str>) -> SyncResult<SyncSummary> {
        let bin = bin.map(str::to_string);
        self.blocking(move |store| store.summary(bin.as_deref())).await
    }

    async fn list_items(&self, bin: &str) -> SyncResult<ItemList> {
        let bin = bin.to_string();
        self.blocking(move |store| {
            let items = store.list_items(&bin)?;
            let def = store.definition(&bin)?;
            Ok(ItemList::new(items, (!def.is_empty()).then_some(def)))
        })
        .await
    }

    async fn get_item(&self, bin: &str, id: &str) -> SyncResult<Option<Value>> {
        let (bin, id) = (bin.to_string(), id.to_string());
        self.blocking(move |store| match store.get(&bin, &id) {
            Ok(content) => Ok(Some(content)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn put_item(&self, bin: &str, id: &str, content: &Value, stamp: Stamp) -> SyncResult<()> {
        let (bin, id, content) = (bin.to_string(), id.to_string(), content.clone());
        self.blocking(move |store| store.put(&bin, &id, &content, Some(stamp)).map(drop))
            .await
    }

    async fn delete_item(&self, bin: &str, id: &str, stamp: Stamp) -> SyncResult<()> {
        let (bin, id) = (bin.to_string(), id.to_string());
        self.blocking(move |store| store.soft_delete(&bin, &id, Some(stamp)).map(drop))
            .await
    }

    async fn put_index(&self, bin: &str, def: &IndexDefinition) -> SyncResult<()> {
        let (bin, def) = (bin.to_string(), def.clone());
        self.blocking(move |store| store.set_definition(&bin, &def).map(drop))
            .await
    }

    async fn cleanup(&self, days: u32) -> SyncResult<usize> {
        self.blocking(move |store| store.cleanup(None, Stamp::days_ago(days)))
            .await
    }
}
