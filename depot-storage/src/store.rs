//! The version store.
//!
//! Every write appends a row to `versions`; nothing is updated in place.
//! The current version of a document is the row with the greatest stamp,
//! and among rows sharing that stamp the one inserted last (highest `seq`).
//! A write and the re-indexing of the affected document run in one
//! transaction.

use crate::config::{BinConfig, BinConfigCache};
use crate::error::{StorageError, StorageResult};
use crate::index;
use crate::schema;
use depot_types::{
    validate_name, DocId, Stamp, SummaryEntry, SyncSummary, VersionRecord, VersionStatus,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Document store backed by a single SQLite connection.
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    bin_config: BinConfigCache,
    path: Option<PathBuf>,
}

/// A version row as read from the database.
#[derive(Debug, Clone)]
pub(crate) struct Version {
    pub id: String,
    pub stamp: Stamp,
    pub status: VersionStatus,
    pub content: Option<Value>,
}

impl Version {
    const COLUMNS: &'static str = "id, stamp, status, content";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stamp_text: String = row.get(1)?;
        let stamp = Stamp::parse(&stamp_text).map_err(|e| text_column_error(1, e))?;
        let status: String = row.get(2)?;
        let content = match row.get::<_, Option<String>>(3)? {
            Some(text) => Some(serde_json::from_str(&text).map_err(|e| text_column_error(3, e))?),
            None => None,
        };
        Ok(Self {
            id: row.get(0)?,
            stamp,
            status: VersionStatus::from_code(&status),
            content,
        })
    }

    /// Content of an active version; `None` for tombstones.
    pub fn active_content(self) -> Option<Value> {
        if self.status.is_active() {
            Some(self.content.unwrap_or(Value::Null))
        } else {
            None
        }
    }
}

impl Store {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let mut store = Self::open_with_conn(Arc::new(Mutex::new(conn)))?;
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// Wraps an existing connection, applying any pending migrations.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        {
            let mut guard = conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            schema::migrate(&mut guard)?;
        }
        Ok(Self {
            conn,
            bin_config: BinConfigCache::new(),
            path: None,
        })
    }

    /// Location of the database file; `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Schema version of the open database.
    pub fn version(&self) -> StorageResult<u32> {
        let conn = self.conn()?;
        schema::stored_version(&conn)
    }

    pub(crate) fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Runs `f` in a transaction; an error from `f` rolls everything back.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub(crate) fn config_with(&self, conn: &Connection, bin: &str) -> StorageResult<BinConfig> {
        self.bin_config.get_or_load(bin, || load_bin_config(conn, bin))
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Appends an active version of `bin/id`.
    ///
    /// An empty `id` is replaced with a generated one. Without a `stamp`
    /// the current time is used. Returns the id written.
    pub fn put(
        &self,
        bin: &str,
        id: &str,
        content: &Value,
        stamp: Option<Stamp>,
    ) -> StorageResult<DocId> {
        validate_name("bin", bin)?;
        let id = DocId::or_generate(Some(id))?;
        let stamp = stamp.unwrap_or_else(Stamp::now);
        let text = serde_json::to_string(content)?;

        self.write(|tx| {
            insert_version(tx, bin, &id, stamp, VersionStatus::Active, Some(&text))?;
            index::refresh_document(tx, bin, &id)
        })?;

        debug!(bin, id = %id, stamp = %stamp, "put");
        Ok(id)
    }

    /// Stores `content` under a freshly generated id.
    pub fn create(&self, bin: &str, content: &Value) -> StorageResult<DocId> {
        self.put(bin, "", content, None)
    }

    /// Appends a tombstone for `bin/id`.
    ///
    /// Without a `stamp` the document must currently be active. A stamped
    /// delete replays a deletion from elsewhere and is always recorded.
    pub fn soft_delete(&self, bin: &str, id: &str, stamp: Option<Stamp>) -> StorageResult<Stamp> {
        validate_name("bin", bin)?;
        validate_name("document", id)?;
        let explicit = stamp.is_some();
        let stamp = stamp.unwrap_or_else(Stamp::now);

        self.write(|tx| {
            let active = current_version(tx, bin, id)?.is_some_and(|v| v.status.is_active());
            if !explicit && !active {
                return Err(StorageError::not_found(bin, id));
            }
            insert_version(tx, bin, id, stamp, VersionStatus::Inactive, None)?;
            index::refresh_document(tx, bin, id)
        })?;

        debug!(bin, id, stamp = %stamp, "soft delete");
        Ok(stamp)
    }

    /// Applies an RFC 6902 patch to the current content and stores the
    /// result as a new version. Returns the new content.
    ///
    /// Read, patch and write happen in one transaction. The new version is
    /// stamped no earlier than the one it patches, so it always becomes
    /// current.
    pub fn patch(&self, bin: &str, id: &str, patch: &Value) -> StorageResult<Value> {
        let ops: json_patch::Patch = serde_json::from_value(patch.clone())
            .map_err(|e| StorageError::InvalidPatch(e.to_string()))?;

        let content = self.write(|tx| {
            let current = current_version(tx, bin, id)?.filter(|v| v.status.is_active());
            let Some(current) = current else {
                return Err(StorageError::not_found(bin, id));
            };
            let stamp = Stamp::now().max(current.stamp);
            let mut content = current.content.unwrap_or(Value::Null);
            json_patch::patch(&mut content, &ops)
                .map_err(|e| StorageError::InvalidPatch(e.to_string()))?;
            let text = serde_json::to_string(&content)?;
            insert_version(tx, bin, id, stamp, VersionStatus::Active, Some(&text))?;
            index::refresh_document(tx, bin, id)?;
            Ok(content)
        })?;

        debug!(bin, id, "patch");
        let conn = self.conn()?;
        Ok(self.config_with(&conn, bin)?.apply(id, content))
    }

    /// Removes every version, index entry and the configuration of `bin`.
    pub fn delete_bin(&self, bin: &str) -> StorageResult<usize> {
        let removed = self.write(|tx| {
            let removed = tx.execute("DELETE FROM versions WHERE bin = ?1", [bin])?;
            tx.execute("DELETE FROM index_entries WHERE bin = ?1", [bin])?;
            tx.execute("DELETE FROM index_keys WHERE bin = ?1", [bin])?;
            tx.execute("DELETE FROM bin_config WHERE bin = ?1", [bin])?;
            Ok(removed)
        })?;
        self.bin_config.invalidate(bin)?;
        debug!(bin, removed, "delete bin");
        Ok(removed)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Current content of `bin/id`.
    pub fn get(&self, bin: &str, id: &str) -> StorageResult<Value> {
        let conn = self.conn()?;
        let content = current_version(&conn, bin, id)?
            .and_then(Version::active_content)
            .ok_or_else(|| StorageError::not_found(bin, id))?;
        debug!(bin, id, "get");
        Ok(self.config_with(&conn, bin)?.apply(id, content))
    }

    /// Every recorded version of `bin/id`, oldest first.
    pub fn history(&self, bin: &str, id: &str) -> StorageResult<Vec<VersionRecord>> {
        let conn = self.conn()?;
        let cfg = self.config_with(&conn, bin)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM versions WHERE bin = ?1 AND id = ?2 ORDER BY stamp, seq",
            Version::COLUMNS
        ))?;
        let records = stmt
            .query_map(params![bin, id], Version::from_row)?
            .map(|row| -> StorageResult<VersionRecord> {
                let v = row?;
                let active = v.status.is_active();
                let content = match v.content {
                    Some(content) if active => cfg.apply(id, content),
                    _ => Value::Null,
                };
                Ok(VersionRecord {
                    stamp: v.stamp,
                    active,
                    content,
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;

        if records.is_empty() {
            return Err(StorageError::not_found(bin, id));
        }
        debug!(bin, id, versions = records.len(), "history");
        Ok(records)
    }

    /// Bins with at least one active document.
    pub fn list_bins(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT bin FROM current_versions WHERE status = 'A' ORDER BY bin",
        )?;
        let bins = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(bins)
    }

    /// Ids of the active documents in `bin`, sorted.
    pub fn list_ids(&self, bin: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM current_versions WHERE bin = ?1 AND status = 'A' ORDER BY id",
        )?;
        let ids = stmt
            .query_map([bin], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Current content of every active document in `bin`.
    pub fn list_items(&self, bin: &str) -> StorageResult<BTreeMap<String, Value>> {
        let conn = self.conn()?;
        let cfg = self.config_with(&conn, bin)?;
        let items = active_documents(&conn, bin)?
            .into_iter()
            .map(|(id, content)| {
                let content = cfg.apply(&id, content);
                (id, content)
            })
            .collect();
        Ok(items)
    }

    /// Latest-version metadata for every document, or for one bin.
    ///
    /// Tombstoned documents are included with `active: false`.
    pub fn summary(&self, bin: Option<&str>) -> StorageResult<SyncSummary> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT bin, {} FROM current_versions WHERE ?1 IS NULL OR bin = ?1",
            Version::COLUMNS
        ))?;
        let mut summary = SyncSummary::new();
        let rows = stmt.query_map([bin], |row| {
            let bin: String = row.get(0)?;
            let stamp_text: String = row.get(2)?;
            let stamp = Stamp::parse(&stamp_text)
                .map_err(|e| text_column_error(2, e))?;
            let status: String = row.get(3)?;
            Ok((bin, row.get::<_, String>(1)?, stamp, VersionStatus::from_code(&status)))
        })?;
        for row in rows {
            let (bin, id, stamp, status) = row?;
            summary.insert(
                bin,
                id,
                SummaryEntry {
                    stamp,
                    active: status.is_active(),
                },
            );
        }
        Ok(summary)
    }

    // ── Bin configuration ────────────────────────────────────────

    /// Configuration of `bin`; defaults when none was stored.
    pub fn bin_config(&self, bin: &str) -> StorageResult<BinConfig> {
        let conn = self.conn()?;
        self.config_with(&conn, bin)
    }

    /// Replaces the configuration of `bin`.
    pub fn set_bin_config(&self, bin: &str, cfg: BinConfig) -> StorageResult<()> {
        validate_name("bin", bin)?;
        self.write(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO bin_config (bin, include_id) VALUES (?1, ?2)",
                params![bin, cfg.include_id_code()],
            )?;
            Ok(())
        })?;
        self.bin_config.invalidate(bin)?;
        debug!(bin, include_id = cfg.include_id, "set bin config");
        Ok(())
    }
}

fn insert_version(
    tx: &Connection,
    bin: &str,
    id: &str,
    stamp: Stamp,
    status: VersionStatus,
    content: Option<&str>,
) -> StorageResult<()> {
    tx.execute(
        "INSERT INTO versions (bin, id, stamp, status, content) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![bin, id, stamp.to_storage_string(), status.code(), content],
    )?;
    Ok(())
}

/// A text column that failed to decode.
fn text_column_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

/// The current version of `bin/id`, active or not.
pub(crate) fn current_version(
    conn: &Connection,
    bin: &str,
    id: &str,
) -> StorageResult<Option<Version>> {
    let version = conn
        .query_row(
            &format!(
                "SELECT {} FROM versions WHERE bin = ?1 AND id = ?2
                 ORDER BY stamp DESC, seq DESC LIMIT 1",
                Version::COLUMNS
            ),
            params![bin, id],
            Version::from_row,
        )
        .optional()?;
    Ok(version)
}

/// Id and content of every active document in `bin`, sorted by id.
pub(crate) fn active_documents(
    conn: &Connection,
    bin: &str,
) -> StorageResult<Vec<(String, Value)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM current_versions WHERE bin = ?1 AND status = 'A' ORDER BY id",
        Version::COLUMNS
    ))?;
    let docs = stmt
        .query_map([bin], Version::from_row)?
        .filter_map(|row| match row {
            Ok(v) => {
                let id = v.id.clone();
                v.active_content().map(|content| Ok((id, content)))
            }
            Err(e) => Some(Err(e.into())),
        })
        .collect::<StorageResult<Vec<_>>>()?;
    Ok(docs)
}

fn load_bin_config(conn: &Connection, bin: &str) -> StorageResult<BinConfig> {
    let code: Option<String> = conn
        .query_row("SELECT include_id FROM bin_config WHERE bin = ?1", [bin], |row| row.get(0))
        .optional()?;
    Ok(code.map(|c| BinConfig::from_code(&c)).unwrap_or_default())
}
