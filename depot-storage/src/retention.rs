//! Purging of superseded versions and old tombstones.

use crate::error::StorageResult;
use crate::Store;
use depot_types::Stamp;
use rusqlite::params;
use tracing::debug;

impl Store {
    /// Removes versions older than `cutoff` that are either superseded or a
    /// current tombstone, in one bin or across all bins.
    ///
    /// The current active version of a document is always kept. Returns the
    /// number of versions removed.
    pub fn cleanup(&self, bin: Option<&str>, cutoff: Stamp) -> StorageResult<usize> {
        let cutoff_text = cutoff.to_storage_string();
        let removed = self.write(|tx| {
            // Eligibility is decided before anything is removed, so deleting
            // a tombstone cannot make an older version look current.
            let mut stmt = tx.prepare(
                "SELECT v.seq FROM versions v
                 WHERE v.stamp < ?1
                   AND (?2 IS NULL OR v.bin = ?2)
                   AND (v.status = 'I' OR EXISTS (
                        SELECT 1 FROM versions w
                        WHERE w.bin = v.bin AND w.id = v.id
                          AND (w.stamp > v.stamp OR (w.stamp = v.stamp AND w.seq > v.seq))))",
            )?;
            let doomed = stmt
                .query_map(params![cutoff_text, bin], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            let mut delete = tx.prepare("DELETE FROM versions WHERE seq = ?1")?;
            for seq in &doomed {
                delete.execute([seq])?;
            }
            Ok(doomed.len())
        })?;

        debug!(bin = bin.unwrap_or("*"), cutoff = %cutoff, removed, "cleanup");
        Ok(removed)
    }
}
