//! Two-peer replication for depot.
//!
//! Two depot instances converge by comparing summaries of their latest
//! versions and copying whichever side is newer.
//!
//! # Architecture
//!
//! - **Peer**: the contract an instance exposes (summary, items, writes)
//! - **HttpPeer**: a remote instance reached over its HTTP interface
//! - **LocalPeer**: a store in the same process
//! - **Engine**: plans and applies the copies and deletes
//!
//! # Example
//!
//! ```no_run
//! use depot_sync::{HttpPeer, SyncEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> depot_sync::SyncResult<()> {
//! let home = HttpPeer::new("home", "http://localhost:8001")?;
//! let cloud = HttpPeer::new("cloud", "https://depot.example")?
//!     .with_credentials("alice", "secret");
//! let report = SyncEngine::new(Arc::new(home), Arc::new(cloud)).run(None).await?;
//! println!("{} items copied", report.items_copied);
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod http;
mod local;
mod peer;

pub use engine::{plan, Side, SyncAction, SyncEngine, SyncReport};
pub use error::{SyncError, SyncResult};
pub use http::{Credentials, HttpPeer};
pub use local::LocalPeer;
pub use peer::{ItemList, Peer};
