//! Per-bin configuration and its read cache.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Options stored per bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinConfig {
    /// Merge the document id into returned content under `id`.
    #[serde(default, deserialize_with = "flag")]
    pub include_id: bool,
}

impl BinConfig {
    pub(crate) fn from_code(code: &str) -> Self {
        Self {
            include_id: code == "Y",
        }
    }

    pub(crate) fn include_id_code(self) -> &'static str {
        if self.include_id { "Y" } else { "N" }
    }

    /// Merges `id` into object content when `include_id` is set.
    pub(crate) fn apply(self, id: &str, mut content: Value) -> Value {
        if self.include_id {
            if let Value::Object(map) = &mut content {
                map.insert("id".to_string(), Value::String(id.to_string()));
            }
        }
        content
    }
}

/// Accepts `true`/`false` as well as the `"Y"`/`"N"` flags older clients send.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::String(s) => Ok(matches!(s.as_str(), "Y" | "y" | "true")),
        other => Err(serde::de::Error::custom(format!("expected a flag, got {other}"))),
    }
}

/// Read-through cache of [`BinConfig`] keyed by bin.
#[derive(Debug, Default)]
pub struct BinConfigCache {
    entries: RwLock<HashMap<String, BinConfig>>,
}

impl BinConfigCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached config for `bin`, loading it on a miss.
    pub fn get_or_load(
        &self,
        bin: &str,
        load: impl FnOnce() -> StorageResult<BinConfig>,
    ) -> StorageResult<BinConfig> {
        if let Some(cfg) = self.entries.read().map_err(|_| StorageError::LockPoisoned)?.get(bin) {
            return Ok(*cfg);
        }
        let cfg = load()?;
        self.entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert(bin.to_string(), cfg);
        Ok(cfg)
    }

    /// Drops the cached entry for `bin`.
    pub fn invalidate(&self, bin: &str) -> StorageResult<()> {
        self.entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .remove(bin);
        Ok(())
    }

    /// Number of cached bins.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
