//! Persistence boundary for tirelire
//!
//! A small asynchronous key-value abstraction plus the structural repairs
//! applied to anything read back from storage or from a remote document.

pub mod error;
pub mod repair;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use repair::{clean_for_remote, densify, normalize_month_vector, parse_json};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreRef};

/// Keys under which the household state is stored
pub mod keys {
    /// JSON array of transactions
    pub const TRANSACTIONS: &str = "transactions";
    /// JSON object year → type → category → 12 numbers
    pub const BUDGETS: &str = "budgets";
    /// JSON object type → category names
    pub const CATEGORIES: &str = "customCategories";
    /// Opening balances of the savings categories
    pub const EPARGNE_BASE: &str = "epargneBase";
    /// Stringified epoch-millisecond timestamp of the last write
    pub const LAST_MODIFIED: &str = "lastModified";

    /// Every key written by a full save
    pub const ALL: [&str; 5] = [TRANSACTIONS, BUDGETS, CATEGORIES, EPARGNE_BASE, LAST_MODIFIED];
}

/// Read a key and parse it as JSON
pub async fn read_json(
    store: &dyn KeyValueStore,
    key: &str,
) -> StorageResult<Option<serde_json::Value>> {
    match store.get(key).await? {
        Some(content) => parse_json(key, &content).map(Some),
        None => Ok(None),
    }
}

/// Serialize a value and write it under a key
pub async fn write_json(
    store: &dyn KeyValueStore,
    key: &str,
    value: &serde_json::Value,
) -> StorageResult<()> {
    let content = serde_json::to_string(value).map_err(|e| StorageError::Serialize {
        message: e.to_string(),
    })?;
    store.set(key, &content).await
}

/// Read the stored `lastModified` timestamp, 0 when absent or unreadable
pub async fn read_last_modified(store: &dyn KeyValueStore) -> StorageResult<i64> {
    let stamp = store.get(keys::LAST_MODIFIED).await?;
    Ok(stamp
        .and_then(|s| s.trim().trim_matches('"').parse::<i64>().ok())
        .unwrap_or(0))
}

/// Record the `lastModified` timestamp
pub async fn write_last_modified(store: &dyn KeyValueStore, stamp: i64) -> StorageResult<()> {
    store.set(keys::LAST_MODIFIED, &stamp.to_string()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        assert!(read_json(&store, keys::BUDGETS).await.unwrap().is_none());

        write_json(&store, keys::BUDGETS, &json!({ "2025": {} })).await.unwrap();
        let value = read_json(&store, keys::BUDGETS).await.unwrap().unwrap();
        assert_eq!(value, json!({ "2025": {} }));
    }

    #[tokio::test]
    async fn test_corrupt_json_is_reported() {
        let store = MemoryStore::new();
        store.set(keys::TRANSACTIONS, "[{").await.unwrap();
        assert!(matches!(
            read_json(&store, keys::TRANSACTIONS).await,
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_last_modified() {
        let store = MemoryStore::new();
        assert_eq!(read_last_modified(&store).await.unwrap(), 0);

        write_last_modified(&store, 1_735_689_600_000).await.unwrap();
        assert_eq!(read_last_modified(&store).await.unwrap(), 1_735_689_600_000);

        store.set(keys::LAST_MODIFIED, "garbage").await.unwrap();
        assert_eq!(read_last_modified(&store).await.unwrap(), 0);
    }
}
