//! Application context: the single household plus its persistence and sync

use anyhow::Context;
use std::sync::Arc;
use tirelire_config::Config;
use tirelire_core::{Household, HouseholdStore};
use tirelire_storage::{FileStore, StoreRef};
use tirelire_sync::{FileRemote, RemoteRef, SyncEngine};
use tokio::sync::RwLock;

pub struct App {
    pub config: Config,
    pub store: Arc<HouseholdStore>,
    pub household: Arc<RwLock<Household>>,
    pub sync: Option<Arc<SyncEngine>>,
    pub remote: Option<Arc<FileRemote>>,
}

impl App {
    /// Load the household from the data directory and catch up with the remote
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let files: StoreRef = Arc::new(FileStore::new(config.data.path.clone()));
        let store = Arc::new(HouseholdStore::new(files));
        let household = store
            .load(&config.epargne)
            .await
            .with_context(|| format!("Failed to load data from {}", config.data.path.display()))?;
        let household = Arc::new(RwLock::new(household));

        let mut app = Self {
            config,
            store,
            household,
            sync: None,
            remote: None,
        };

        if app.config.sync.enabled {
            if let Some(path) = app.config.sync.remote_path.clone() {
                let remote = Arc::new(FileRemote::new(path));
                let remote_ref: RemoteRef = remote.clone();
                let engine = SyncEngine::new(
                    app.household.clone(),
                    app.store.clone(),
                    remote_ref,
                    app.config.sync.device_name.clone(),
                    app.config.sync_debounce(),
                );
                // An unreachable remote leaves the local state usable
                if let Err(e) = engine.reconcile().await {
                    log::warn!("Synchronization unavailable: {}", e);
                }
                app.sync = Some(engine);
                app.remote = Some(remote);
            }
        }

        Ok(app)
    }

    /// Save what the last mutation changed and schedule a remote push
    pub async fn persist(&self) -> anyhow::Result<()> {
        let saved = {
            let mut household = self.household.write().await;
            self.store.save(&mut household).await?
        };
        if let (Some(stamp), Some(engine)) = (saved, &self.sync) {
            log::debug!("Local save at {}, scheduling push", stamp);
            engine.schedule_push();
        }
        Ok(())
    }

    /// Wait for pending pushes before the process exits
    pub async fn finish(&self) {
        if let Some(engine) = &self.sync {
            engine.flush().await;
            log::info!("Sync status: {}", engine.current_status());
        }
    }
}
