//! Replication of the household state to a shared remote document

pub mod document;
pub mod engine;
pub mod error;
pub mod remote;

pub use document::RemoteDocument;
pub use engine::{Reconciliation, SyncEngine, SyncStatus};
pub use error::{SyncError, SyncResult};
pub use remote::{FileRemote, MemoryRemote, RemoteRef, RemoteStore};
