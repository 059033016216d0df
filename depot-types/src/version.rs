//! Version records and the per-document sync summary.

use crate::Stamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Whether a version holds content or marks a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Active,
    Inactive,
}

impl VersionStatus {
    /// Single-letter code used in the storage schema.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
        }
    }

    /// Parses a storage code. Anything other than `I` is active.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code == "I" { Self::Inactive } else { Self::Active }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// One entry of a document's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// When the version was written.
    #[serde(rename = "dttm")]
    pub stamp: Stamp,
    /// False for tombstones.
    pub active: bool,
    /// Document content; `null` for tombstones.
    pub content: Value,
}

/// Latest-version metadata for a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    #[serde(rename = "dttm")]
    pub stamp: Stamp,
    pub active: bool,
}

/// Summary of one bin: document id to latest-version metadata.
pub type BinSummary = BTreeMap<String, SummaryEntry>;

/// Summary of a store: bin name to [`BinSummary`].
///
/// Serializes as `{bin: {id: {dttm, active}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncSummary(BTreeMap<String, BinSummary>);

impl SyncSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest version of `bin/id`.
    pub fn insert(&mut self, bin: impl Into<String>, id: impl Into<String>, entry: SummaryEntry) {
        self.0.entry(bin.into()).or_default().insert(id.into(), entry);
    }

    /// Returns the summary for one bin.
    #[must_use]
    pub fn bin(&self, bin: &str) -> Option<&BinSummary> {
        self.0.get(bin)
    }

    /// Returns the entry for one document.
    #[must_use]
    pub fn entry(&self, bin: &str, id: &str) -> Option<&SummaryEntry> {
        self.0.get(bin).and_then(|b| b.get(id))
    }

    /// Iterates over bin names in order.
    pub fn bins(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains_bin(&self, bin: &str) -> bool {
        self.0.contains_key(bin)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of documents across all bins.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }
}
