//! Last-write-wins replication between the local store and a remote
//!
//! The engine reconciles once at start, then pushes the whole household
//! after each mutation (debounced) and adopts any remote document whose
//! `lastModified` is strictly newer than the local one. There is no merge:
//! the older side is discarded.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;

use tirelire_core::{Household, HouseholdStore};

use crate::document::RemoteDocument;
use crate::error::SyncResult;
use crate::remote::RemoteRef;

/// Replication state shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum SyncStatus {
    Offline,
    Syncing,
    Synced,
    Error(String),
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Offline => write!(f, "offline"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// What the start-up reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The remote was newer and replaced the local state
    Pulled,
    /// The local state was newer, or the remote empty, and was pushed
    Pushed,
    /// Both sides carry the same timestamp
    UpToDate,
}

pub struct SyncEngine {
    household: Arc<RwLock<Household>>,
    store: Arc<HouseholdStore>,
    remote: RemoteRef,
    device: String,
    debounce: Duration,
    applying_remote: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
    status: watch::Sender<SyncStatus>,
}

impl SyncEngine {
    pub fn new(
        household: Arc<RwLock<Household>>,
        store: Arc<HouseholdStore>,
        remote: RemoteRef,
        device: impl Into<String>,
        debounce: Duration,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(SyncStatus::Offline);
        Arc::new(Self {
            household,
            store,
            remote,
            device: device.into(),
            debounce,
            applying_remote: AtomicBool::new(false),
            pending: Mutex::new(None),
            status,
        })
    }

    /// Watch the replication state
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    /// Reconcile, then follow remote updates until the remote goes away
    pub async fn start(self: &Arc<Self>) -> SyncResult<JoinHandle<()>> {
        match self.reconcile().await {
            Ok(_) => Ok(self.listen()),
            Err(e) => {
                log::error!("Initial synchronization failed: {}", e);
                self.set_status(SyncStatus::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Local timestamp: the persisted one, or a newer stamp already issued for a push
    async fn local_stamp(&self) -> SyncResult<i64> {
        let persisted = self.store.last_modified().await?;
        Ok(persisted.max(self.store.latest_stamp()))
    }

    /// Compare timestamps once and move the newer side over the older one
    pub async fn reconcile(&self) -> SyncResult<Reconciliation> {
        self.set_status(SyncStatus::Syncing);
        let local = self.local_stamp().await?;

        let outcome = match self.remote.fetch_remote().await? {
            Some(document) if document.last_modified > local => {
                log::info!(
                    "Remote is newer ({} > {}), adopting it",
                    document.last_modified,
                    local
                );
                self.apply_remote(document).await?;
                Reconciliation::Pulled
            }
            Some(document) if document.last_modified == local => {
                log::info!("Local and remote in sync at {}", local);
                Reconciliation::UpToDate
            }
            Some(_) | None => {
                log::info!("Local state is newer, pushing it");
                self.push_now().await?;
                Reconciliation::Pushed
            }
        };
        self.set_status(SyncStatus::Synced);
        Ok(outcome)
    }

    /// Adopt a remote document if it is strictly newer; returns whether it was applied
    pub async fn apply_remote(&self, document: RemoteDocument) -> SyncResult<bool> {
        let local = self.local_stamp().await?;
        if document.last_modified <= local {
            log::debug!(
                "Ignoring remote document at {} (local {})",
                document.last_modified,
                local
            );
            return Ok(false);
        }

        self.applying_remote.store(true, Ordering::SeqCst);
        let result = async {
            let mut household = self.household.write().await;
            household.apply_snapshot(document.to_snapshot());
            self.store
                .save_all_at(&mut household, document.last_modified)
                .await
        }
        .await;
        self.applying_remote.store(false, Ordering::SeqCst);

        result?;
        log::info!(
            "Applied remote update from '{}' at {}",
            document.last_device,
            document.last_modified
        );
        self.set_status(SyncStatus::Synced);
        Ok(true)
    }

    /// Push the whole household now under a fresh timestamp
    pub async fn push_now(&self) -> SyncResult<i64> {
        let stamp = self.store.next_stamp();
        let document = {
            let household = self.household.read().await;
            RemoteDocument::from_household(&household, stamp, &self.device)?
        };
        // Recorded first so the echo of this push compares equal
        self.store.record_stamp(stamp).await?;
        self.remote.push_remote(&document).await?;
        log::info!("Pushed household to remote at {}", stamp);
        Ok(stamp)
    }

    /// Push after the debounce window; a newer call replaces a waiting one
    pub fn schedule_push(self: &Arc<Self>) {
        if self.applying_remote.load(Ordering::SeqCst) {
            log::debug!("Skipping push while a remote update is applied");
            return;
        }
        self.set_status(SyncStatus::Syncing);

        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(engine.debounce).await;
            match engine.push_now().await {
                Ok(_) => engine.set_status(SyncStatus::Synced),
                Err(e) => {
                    log::error!("Push to remote failed: {}", e);
                    engine.set_status(SyncStatus::Error(e.to_string()));
                }
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Wait for a scheduled push to finish
    pub async fn flush(&self) {
        let task = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            // An aborted task is already replaced
            let _ = task.await;
        }
    }

    /// Apply remote updates as they arrive
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut updates = self.remote.subscribe();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(document) => {
                        if let Err(e) = engine.apply_remote(document).await {
                            log::error!("Cannot apply remote update: {}", e);
                            engine.set_status(SyncStatus::Error(e.to_string()));
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Missed {} remote updates", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        engine.set_status(SyncStatus::Offline);
                        break;
                    }
                }
            }
        })
    }
}
