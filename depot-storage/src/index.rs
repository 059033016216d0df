//! Index definitions and materialized index entries.
//!
//! Entries always mirror the current version: writes refresh the entries of
//! the document they touch, and replacing a definition rebuilds the bin.

use crate::error::{StorageError, StorageResult};
use crate::store::{active_documents, current_version, Version};
use crate::Store;
use depot_types::path::{resolve, resolve_list};
use depot_types::{validate_name, IndexDefinition, IndexKey, IndexValue, Operator};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Loads the definition of `bin`; empty when none was set.
pub(crate) fn load_definition(conn: &Connection, bin: &str) -> StorageResult<IndexDefinition> {
    let mut stmt = conn.prepare(
        "SELECT key, path, operator FROM index_keys WHERE bin = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map([bin], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let keys = rows
        .into_iter()
        .map(|(name, path, op)| -> StorageResult<IndexKey> {
            Ok(IndexKey::new(name, path, op.parse::<Operator>()?))
        })
        .collect::<StorageResult<Vec<_>>>()?;
    Ok(IndexDefinition::from_keys(keys)?)
}

/// Replaces the entries of `bin/id` with those derived from `content`.
///
/// `None` content (a tombstone) only clears the old entries.
pub(crate) fn index_document(
    conn: &Connection,
    bin: &str,
    id: &str,
    content: Option<&Value>,
    def: &IndexDefinition,
) -> StorageResult<()> {
    conn.execute("DELETE FROM index_entries WHERE bin = ?1 AND id = ?2", params![bin, id])?;
    let Some(content) = content else {
        return Ok(());
    };

    let mut insert = conn.prepare_cached(
        "INSERT INTO index_entries (bin, key, id, value, raw) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for key in def {
        for value in extract(key, content)? {
            insert.execute(params![bin, key.name, id, value.sort_key(), value.raw()])?;
        }
    }
    Ok(())
}

/// The values one key contributes for a document.
fn extract(key: &IndexKey, content: &Value) -> StorageResult<Vec<IndexValue>> {
    if key.operator == Operator::InList {
        let items = resolve_list(content, &key.path).map_err(|_| StorageError::InvalidPathValue {
            key: key.name.clone(),
            path: key.path.clone(),
        })?;
        Ok(items
            .unwrap_or_default()
            .iter()
            .map(|item| IndexValue::encode(Some(item)))
            .collect())
    } else {
        Ok(vec![IndexValue::encode(resolve(content, &key.path))])
    }
}

/// Re-derives the entries of `bin/id` from its current version.
pub(crate) fn refresh_document(conn: &Connection, bin: &str, id: &str) -> StorageResult<()> {
    let def = load_definition(conn, bin)?;
    let content = current_version(conn, bin, id)?.and_then(Version::active_content);
    index_document(conn, bin, id, content.as_ref(), &def)
}

fn rebuild(conn: &Connection, bin: &str, def: &IndexDefinition) -> StorageResult<usize> {
    conn.execute("DELETE FROM index_entries WHERE bin = ?1", [bin])?;
    let docs = active_documents(conn, bin)?;
    for (id, content) in &docs {
        index_document(conn, bin, id, Some(content), def)?;
    }
    Ok(docs.len())
}

/// Index entries of one bin for the given keys, grouped by document id
/// and key.
pub(crate) fn load_entries(
    conn: &Connection,
    bin: &str,
    keys: &BTreeSet<&str>,
) -> StorageResult<HashMap<String, HashMap<String, Vec<IndexValue>>>> {
    let mut stmt = conn.prepare("SELECT id, key, value, raw FROM index_entries WHERE bin = ?1")?;
    let rows = stmt.query_map([bin], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            IndexValue::from_parts(row.get(2)?, row.get(3)?),
        ))
    })?;

    let mut entries: HashMap<String, HashMap<String, Vec<IndexValue>>> = HashMap::new();
    for row in rows {
        let (id, key, value) = row?;
        if !keys.contains(key.as_str()) {
            continue;
        }
        entries.entry(id).or_default().entry(key).or_default().push(value);
    }
    Ok(entries)
}

impl Store {
    /// Replaces the index definition of `bin` and rebuilds its entries.
    ///
    /// Returns the number of documents re-indexed. A document whose
    /// `in_list` path holds a non-list value fails the whole call.
    pub fn set_definition(&self, bin: &str, def: &IndexDefinition) -> StorageResult<usize> {
        validate_name("bin", bin)?;
        let count = self.write(|tx| {
            tx.execute("DELETE FROM index_keys WHERE bin = ?1", [bin])?;
            for (position, key) in def.iter().enumerate() {
                tx.execute(
                    "INSERT INTO index_keys (bin, key, path, operator, position)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![bin, key.name, key.path, key.operator.as_str(), position as i64],
                )?;
            }
            rebuild(tx, bin, def)
        })?;
        debug!(bin, keys = def.len(), documents = count, "set index definition");
        Ok(count)
    }

    /// The index definition of `bin`.
    pub fn definition(&self, bin: &str) -> StorageResult<IndexDefinition> {
        let conn = self.conn()?;
        load_definition(&conn, bin)
    }

    /// Recomputes every entry of `bin` from current content.
    pub fn reindex(&self, bin: &str) -> StorageResult<usize> {
        let count = self.write(|tx| {
            let def = load_definition(tx, bin)?;
            rebuild(tx, bin, &def)
        })?;
        debug!(bin, documents = count, "reindex");
        Ok(count)
    }

    /// Distinct values indexed under `key`, in index order.
    pub fn index_values(&self, bin: &str, key: &str) -> StorageResult<Vec<Value>> {
        let conn = self.conn()?;
        if load_definition(&conn, bin)?.get(key).is_none() {
            return Err(StorageError::InvalidSearchKey(key.to_string()));
        }
        let mut stmt = conn.prepare(
            "SELECT value, MIN(raw) FROM index_entries
             WHERE bin = ?1 AND key = ?2 GROUP BY value ORDER BY value",
        )?;
        let values = stmt
            .query_map(params![bin, key], |row| {
                Ok(IndexValue::from_parts(row.get(0)?, row.get(1)?).decode())
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }
}
