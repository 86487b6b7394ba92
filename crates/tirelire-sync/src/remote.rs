//! Remote stores holding the replicated document

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use crate::document::RemoteDocument;
use crate::error::{SyncError, SyncResult};

/// Pending updates a slow subscriber may lag behind
const CHANNEL_CAPACITY: usize = 16;

/// Remote reference type
pub type RemoteRef = Arc<dyn RemoteStore>;

/// Shared store for the whole-state document
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current document, `None` before the first push
    async fn fetch_remote(&self) -> SyncResult<Option<RemoteDocument>>;

    /// Replace the document and notify subscribers
    async fn push_remote(&self, document: &RemoteDocument) -> SyncResult<()>;

    /// Receive every document written from now on, own pushes included
    fn subscribe(&self) -> broadcast::Receiver<RemoteDocument>;
}

fn notify(sender: &broadcast::Sender<RemoteDocument>, document: &RemoteDocument) {
    // No subscriber is not an error
    let _ = sender.send(document.clone());
}

// ==================== Memory Remote ====================

/// In-process remote, shared by every engine holding it
pub struct MemoryRemote {
    document: RwLock<Option<RemoteDocument>>,
    sender: broadcast::Sender<RemoteDocument>,
    pushes: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            document: RwLock::new(None),
            sender,
            pushes: AtomicUsize::new(0),
        }
    }

    /// Number of documents pushed so far
    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_remote(&self) -> SyncResult<Option<RemoteDocument>> {
        Ok(self.document.read().await.clone())
    }

    async fn push_remote(&self, document: &RemoteDocument) -> SyncResult<()> {
        *self.document.write().await = Some(document.clone());
        self.pushes.fetch_add(1, Ordering::SeqCst);
        notify(&self.sender, document);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteDocument> {
        self.sender.subscribe()
    }
}

// ==================== File Remote ====================

/// A JSON file shared between devices, e.g. in a synced folder
pub struct FileRemote {
    path: PathBuf,
    sender: broadcast::Sender<RemoteDocument>,
}

impl FileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            path: path.into(),
            sender,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll the file and notify subscribers when another writer changed it
    pub fn spawn_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let remote = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut seen = 0i64;
            loop {
                ticker.tick().await;
                match remote.fetch_remote().await {
                    Ok(Some(document)) if document.last_modified != seen => {
                        seen = document.last_modified;
                        notify(&remote.sender, &document);
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Cannot read remote {}: {}", remote.path.display(), e),
                }
            }
        })
    }
}

#[async_trait]
impl RemoteStore for FileRemote {
    async fn fetch_remote(&self) -> SyncResult<Option<RemoteDocument>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => RemoteDocument::from_json(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::IoError(e)),
        }
    }

    async fn push_remote(&self, document: &RemoteDocument) -> SyncResult<()> {
        let content = document.to_json()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        notify(&self.sender, document);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteDocument> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(stamp: i64) -> RemoteDocument {
        RemoteDocument {
            transactions: json!([]),
            budgets: json!({}),
            categories: json!({ "Extras": ["Jeux"] }),
            epargne_base: json!({}),
            last_modified: stamp,
            last_device: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_remote_notifies() {
        let remote = MemoryRemote::new();
        assert!(remote.fetch_remote().await.unwrap().is_none());

        let mut rx = remote.subscribe();
        remote.push_remote(&document(5)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().last_modified, 5);
        assert_eq!(remote.fetch_remote().await.unwrap(), Some(document(5)));
        assert_eq!(remote.push_count(), 1);
    }

    #[tokio::test]
    async fn test_file_remote_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let remote = FileRemote::new(dir.path().join("shared/tirelire.json"));
        assert!(remote.fetch_remote().await.unwrap().is_none());

        remote.push_remote(&document(9)).await.unwrap();
        assert_eq!(remote.fetch_remote().await.unwrap(), Some(document(9)));

        tokio::fs::write(remote.path(), "not json").await.unwrap();
        assert!(matches!(
            remote.fetch_remote().await,
            Err(SyncError::InvalidDocument { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_watcher_sees_other_writers() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tirelire.json");
        let remote = Arc::new(FileRemote::new(&path));
        let mut rx = remote.subscribe();
        let watcher = remote.spawn_watcher(Duration::from_millis(10));

        // Another device writes the file directly
        let other = FileRemote::new(&path);
        other.push_remote(&document(11)).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.last_modified, 11);
        watcher.abort();
    }
}
