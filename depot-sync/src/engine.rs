//! Sync engine: last-writer-wins reconciliation of two peers.
//!
//! A run has two phases. [`plan`] compares the two summaries without any
//! I/O and yields the actions needed to converge; [`SyncEngine::run`]
//! fetches the summaries and executes the plan in order.
//!
//! Rules, for each bin:
//! - A bin known to one peer only is copied wholesale: its index definition
//!   first, then every active item with its original stamp.
//! - A document known to one peer only is copied when active. Tombstones
//!   the other peer never saw are not propagated.
//! - A document known to both with different stamps takes the newer
//!   version: active content is copied, a tombstone becomes a delete on the
//!   other peer carrying the same stamp.
//!
//! Index definitions of bins present on both peers are left alone.

use crate::error::SyncResult;
use crate::peer::Peer;
use depot_types::{BinSummary, Stamp, SyncSummary};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which peer an action reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    A,
    B,
}

/// One step needed to bring the peers together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy a bin the other side does not have.
    CopyBin { bin: String, from: Side },
    /// Copy the current content of a document.
    Copy {
        bin: String,
        id: String,
        stamp: Stamp,
        from: Side,
    },
    /// Record on the other side the deletion `from` holds.
    Delete {
        bin: String,
        id: String,
        stamp: Stamp,
        from: Side,
    },
}

/// Counts of what a run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub bins_copied: usize,
    pub items_copied: usize,
    pub items_deleted: usize,
}

impl SyncReport {
    /// True when the peers were already in sync.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Computes the actions that reconcile summary `a` with summary `b`.
#[must_use]
pub fn plan(a: &SyncSummary, b: &SyncSummary) -> Vec<SyncAction> {
    let mut actions = Vec::new();

    for bin in a.bins() {
        if !b.contains_bin(bin) && has_active(a, bin) {
            actions.push(SyncAction::CopyBin {
                bin: bin.to_string(),
                from: Side::A,
            });
        }
    }
    for bin in b.bins() {
        if !a.contains_bin(bin) && has_active(b, bin) {
            actions.push(SyncAction::CopyBin {
                bin: bin.to_string(),
                from: Side::B,
            });
        }
    }

    for bin in a.bins() {
        if let (Some(sa), Some(sb)) = (a.bin(bin), b.bin(bin)) {
            plan_bin(bin, sa, sb, &mut actions);
        }
    }
    actions
}

/// A bin holding only tombstones has nothing to copy.
fn has_active(summary: &SyncSummary, bin: &str) -> bool {
    summary.bin(bin).is_some_and(|docs| docs.values().any(|e| e.active))
}

fn plan_bin(bin: &str, a: &BinSummary, b: &BinSummary, actions: &mut Vec<SyncAction>) {
    let copy = |id: &str, stamp: Stamp, from: Side| SyncAction::Copy {
        bin: bin.to_string(),
        id: id.to_string(),
        stamp,
        from,
    };

    for (id, ea) in a {
        match b.get(id) {
            None if ea.active => actions.push(copy(id, ea.stamp, Side::A)),
            None => {}
            Some(eb) if ea.stamp == eb.stamp => {}
            Some(eb) => {
                let (winner, from) =
                    if ea.stamp > eb.stamp { (ea, Side::A) } else { (eb, Side::B) };
                if winner.active {
                    actions.push(copy(id, winner.stamp, from));
                } else {
                    actions.push(SyncAction::Delete {
                        bin: bin.to_string(),
                        id: id.clone(),
                        stamp: winner.stamp,
                        from,
                    });
                }
            }
        }
    }
    for (id, eb) in b {
        if eb.active && !a.contains_key(id) {
            actions.push(copy(id, eb.stamp, Side::B));
        }
    }
}

/// Runs reconciliation between two peers.
pub struct SyncEngine {
    a: Arc<dyn Peer>,
    b: Arc<dyn Peer>,
}

impl SyncEngine {
    pub fn new(a: Arc<dyn Peer>, b: Arc<dyn Peer>) -> Self {
        Self { a, b }
    }

    fn peers(&self, from: Side) -> (&dyn Peer, &dyn Peer) {
        match from {
            Side::A => (self.a.as_ref(), self.b.as_ref()),
            Side::B => (self.b.as_ref(), self.a.as_ref()),
        }
    }

    /// Reconciles every bin, or only `bin`.
    ///
    /// The first failing request aborts the run; steps already applied are
    /// kept, and running again picks up where this one stopped.
    pub async fn run(&self, bin: Option<&str>) -> SyncResult<SyncReport> {
        let sa = self.a.summary(bin).await?;
        let sb = self.b.summary(bin).await?;
        debug!(
            a = self.a.name(),
            a_docs = sa.document_count(),
            b = self.b.name(),
            b_docs = sb.document_count(),
            "fetched summaries"
        );

        let actions = plan(&sa, &sb);
        let mut report = SyncReport::default();
        for action in &actions {
            self.apply(action, &sa, &sb, &mut report).await?;
        }

        info!(
            a = self.a.name(),
            b = self.b.name(),
            bins_copied = report.bins_copied,
            items_copied = report.items_copied,
            items_deleted = report.items_deleted,
            "sync complete"
        );
        Ok(report)
    }

    async fn apply(
        &self,
        action: &SyncAction,
        sa: &SyncSummary,
        sb: &SyncSummary,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        match action {
            SyncAction::CopyBin { bin, from } => {
                let summary = match from {
                    Side::A => sa,
                    Side::B => sb,
                };
                report.items_copied += self.copy_bin(bin, *from, summary).await?;
                report.bins_copied += 1;
            }
            SyncAction::Copy { bin, id, stamp, from } => {
                let (src, dst) = self.peers(*from);
                match src.get_item(bin, id).await? {
                    Some(content) => {
                        dst.put_item(bin, id, &content, *stamp).await?;
                        info!(from = src.name(), to = dst.name(), %bin, %id, %stamp, "copied item");
                        report.items_copied += 1;
                    }
                    None => warn!(peer = src.name(), %bin, %id, "item vanished before copy"),
                }
            }
            SyncAction::Delete { bin, id, stamp, from } => {
                let (src, dst) = self.peers(*from);
                dst.delete_item(bin, id, *stamp).await?;
                info!(from = src.name(), to = dst.name(), %bin, %id, %stamp, "propagated delete");
                report.items_deleted += 1;
            }
        }
        Ok(())
    }

    async fn copy_bin(&self, bin: &str, from: Side, summary: &SyncSummary) -> SyncResult<usize> {
        let (src, dst) = self.peers(from);
        let list = src.list_items(bin).await?;

        if let Some(def) = list.index.as_ref().filter(|d| !d.is_empty()) {
            dst.put_index(bin, def).await?;
        }

        let mut copied = 0;
        for (id, content) in &list.items {
            let Some(entry) = summary.entry(bin, id) else {
                warn!(peer = src.name(), bin, %id, "item missing from summary, skipped");
                continue;
            };
            dst.put_item(bin, id, content, entry.stamp).await?;
            copied += 1;
        }

        info!(from = src.name(), to = dst.name(), bin, items = copied, "copied bin");
        Ok(copied)
    }
}
