//! The whole-state document exchanged with a remote store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tirelire_core::persist::DOCUMENT_CATEGORIES;
use tirelire_core::{Household, Snapshot};
use tirelire_storage::{clean_for_remote, keys};

use crate::error::{SyncError, SyncResult};

/// Household state as written wholesale to the remote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    #[serde(default)]
    pub transactions: Value,
    #[serde(default)]
    pub budgets: Value,
    #[serde(default)]
    pub categories: Value,
    #[serde(default)]
    pub epargne_base: Value,
    /// Epoch milliseconds of the write
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub last_device: String,
}

impl RemoteDocument {
    /// Build a cleaned document from the household
    pub fn from_household(
        household: &Household,
        last_modified: i64,
        device: &str,
    ) -> SyncResult<Self> {
        let mut document = household.to_document()?;
        let mut take = |key: &str| {
            clean_for_remote(document.remove(key).unwrap_or(Value::Null))
        };
        Ok(Self {
            transactions: take(keys::TRANSACTIONS),
            budgets: take(keys::BUDGETS),
            categories: take(DOCUMENT_CATEGORIES),
            epargne_base: take(keys::EPARGNE_BASE),
            last_modified,
            last_device: device.to_string(),
        })
    }

    /// Decode the parts present in the document
    pub fn to_snapshot(&self) -> Snapshot {
        let mut document = Map::new();
        document.insert(keys::TRANSACTIONS.to_string(), self.transactions.clone());
        document.insert(keys::BUDGETS.to_string(), self.budgets.clone());
        document.insert(DOCUMENT_CATEGORIES.to_string(), self.categories.clone());
        document.insert(keys::EPARGNE_BASE.to_string(), self.epargne_base.clone());
        Snapshot::from_document(&document)
    }

    pub fn from_json(content: &str) -> SyncResult<Self> {
        serde_json::from_str(content).map_err(|e| SyncError::InvalidDocument {
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> SyncResult<String> {
        serde_json::to_string(self).map_err(|e| SyncError::InvalidDocument {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tirelire_config::EpargneConfig;
    use tirelire_core::{CategoryType, TransactionDraft};

    #[test]
    fn test_document_fields_are_camel_case() {
        let h = Household::new(&EpargneConfig::default());
        let doc = RemoteDocument::from_household(&h, 42, "laptop").unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["lastModified"], 42);
        assert_eq!(value["lastDevice"], "laptop");
        assert!(value["epargneBase"].is_object());
        assert_eq!(value["transactions"], json!([]));
    }

    #[test]
    fn test_sparse_remote_arrays_are_restored() {
        let content = r#"{
            "transactions": {
                "0": {"id": 1, "date": "2025-03-05", "type": "Extras", "category": "Shopping", "amount": -7.26},
                "1": {"id": 2, "date": "2025-03-06", "type": "Revenus", "category": "Salaire", "amount": 2500}
            },
            "lastModified": 1000
        }"#;
        let doc = RemoteDocument::from_json(content).unwrap();
        let snapshot = doc.to_snapshot();
        assert_eq!(snapshot.transactions.map(|t| t.len()), Some(2));
        assert!(snapshot.budgets.is_none());
        assert!(snapshot.registry.is_none());
        assert_eq!(doc.last_device, "");
    }

    #[test]
    fn test_household_survives_the_trip() {
        let mut h = Household::new(&EpargneConfig::default());
        h.add_transaction(&TransactionDraft::new(
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            CategoryType::Extras,
            "Shopping",
            dec!(-7.26),
        ))
        .unwrap();
        h.fill_budget_year(2025, CategoryType::Extras, "Shopping", dec!(-100))
            .unwrap();

        let doc = RemoteDocument::from_household(&h, 7, "a").unwrap();
        let text = doc.to_json().unwrap();
        let back = RemoteDocument::from_json(&text).unwrap();

        let mut other = Household::new(&EpargneConfig::default());
        other.apply_snapshot(back.to_snapshot());
        assert_eq!(other.transactions(), h.transactions());
        assert_eq!(other.budgets(), h.budgets());
        assert_eq!(other.registry(), h.registry());
    }
}
