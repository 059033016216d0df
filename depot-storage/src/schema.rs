//! Schema creation and migrations.
//!
//! The `meta` table holds a single row with the schema version. On open,
//! every migration newer than the stored version is applied inside one
//! transaction.

use crate::error::StorageResult;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// Schema version written by the newest migration.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

const MIGRATIONS: &[&str] = &[
    // 1: versions, per-bin config and index tables
    "
    CREATE TABLE IF NOT EXISTS versions (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        bin TEXT NOT NULL,
        id TEXT NOT NULL,
        stamp TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('A', 'I')),
        content TEXT
    );
    CREATE INDEX IF NOT EXISTS versions_doc ON versions (bin, id, stamp, seq);

    CREATE VIEW IF NOT EXISTS current_versions AS
        SELECT v.seq, v.bin, v.id, v.stamp, v.status, v.content
        FROM versions v
        WHERE NOT EXISTS (
            SELECT 1 FROM versions w
            WHERE w.bin = v.bin AND w.id = v.id
              AND (w.stamp > v.stamp OR (w.stamp = v.stamp AND w.seq > v.seq))
        );

    CREATE TABLE IF NOT EXISTS bin_config (
        bin TEXT PRIMARY KEY,
        include_id TEXT NOT NULL DEFAULT 'N'
    );

    CREATE TABLE IF NOT EXISTS index_keys (
        bin TEXT NOT NULL,
        key TEXT NOT NULL,
        path TEXT NOT NULL,
        operator TEXT NOT NULL,
        position INTEGER NOT NULL,
        UNIQUE (bin, key)
    );

    CREATE TABLE IF NOT EXISTS index_entries (
        bin TEXT NOT NULL,
        key TEXT NOT NULL,
        id TEXT NOT NULL,
        value TEXT NOT NULL,
        raw TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS index_entries_doc ON index_entries (bin, id);
    CREATE INDEX IF NOT EXISTS index_entries_key ON index_entries (bin, key, value);
    ",
];

/// Creates the schema or brings an existing database up to date.
pub(crate) fn migrate(conn: &mut Connection) -> StorageResult<u32> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS meta (version INTEGER NOT NULL);")?;
    let current: u32 = conn
        .query_row("SELECT version FROM meta", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0);

    if current >= SCHEMA_VERSION {
        debug!(version = current, "schema up to date");
        return Ok(current);
    }

    let tx = conn.transaction()?;
    for (i, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        debug!(migration = i + 1, "applying migration");
        tx.execute_batch(sql)?;
    }
    tx.execute("DELETE FROM meta", [])?;
    tx.execute("INSERT INTO meta (version) VALUES (?1)", [SCHEMA_VERSION])?;
    tx.commit()?;

    info!(from = current, to = SCHEMA_VERSION, "schema migrated");
    Ok(SCHEMA_VERSION)
}

/// Reads the stored schema version.
pub(crate) fn stored_version(conn: &Connection) -> StorageResult<u32> {
    let version = conn
        .query_row("SELECT version FROM meta", [], |row| row.get(0))
        .optional()?
        .unwrap_or(0);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(migrate(&mut conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM meta", [], |r| r.get(0)).unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn current_view_prefers_later_stamp_then_later_insert() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute_batch(
            "INSERT INTO versions (bin, id, stamp, status, content) VALUES
                ('b', '1', '2024-01-02', 'A', '\"new\"'),
                ('b', '1', '2024-01-01', 'A', '\"old\"'),
                ('b', '2', '2024-01-01', 'A', '\"first\"'),
                ('b', '2', '2024-01-01', 'A', '\"second\"');",
        )
        .unwrap();
        let mut stmt = conn
            .prepare("SELECT id, content FROM current_versions ORDER BY id")
            .unwrap();
        let rows: Vec<(String, String)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![("1".into(), "\"new\"".into()), ("2".into(), "\"second\"".into())]
        );
    }
}
