//! Validated decoding and encoding of the persisted household state
//!
//! Stored and replicated JSON goes through the structural repairs of
//! `tirelire-storage` first, then is decoded leniently here: a corrupt key
//! falls back to its default, a malformed record is dropped, and nothing
//! read from outside can put the household in an invalid state.

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tirelire_config::EpargneConfig;
use tirelire_storage::{
    densify, keys, normalize_month_vector, read_json, read_last_modified, write_json,
    write_last_modified, StorageError, StoreRef,
};

use crate::budgets::{BudgetTable, MonthVector};
use crate::categories::{default_categories, CategoryRegistry};
use crate::error::CoreResult;
use crate::household::{Changes, EpargneSettings, Household};
use crate::models::Transaction;
use crate::transactions::TransactionStore;
use crate::types::CategoryType;

/// Document key holding the category lists (the storage key differs)
pub const DOCUMENT_CATEGORIES: &str = "categories";

// ==================== Decoding ====================

/// Decode a transaction array, dropping what cannot be repaired
pub fn decode_transactions(value: Value) -> Vec<Transaction> {
    let items = match densify(value) {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => {
            log::warn!("Ignoring transactions stored as {}", json_kind(&other));
            return Vec::new();
        }
    };

    let mut decoded: Vec<Transaction> = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if item.is_null() {
            continue;
        }
        match serde_json::from_value::<Transaction>(item) {
            Ok(mut transaction) => {
                let normalized = transaction.category_type.normalize_amount(transaction.amount);
                if normalized != transaction.amount {
                    log::warn!(
                        "Transaction #{} had a positive {} amount, sign fixed",
                        transaction.id,
                        transaction.category_type
                    );
                    transaction.amount = normalized;
                }
                decoded.push(transaction);
            }
            Err(e) => log::warn!("Dropping malformed transaction at index {}: {}", index, e),
        }
    }

    // Duplicate ids get fresh ones past the current maximum
    let mut next_id = decoded.iter().map(|t| t.id).max().unwrap_or(0) + 1;
    let mut seen = HashSet::new();
    for transaction in decoded.iter_mut() {
        if !seen.insert(transaction.id) {
            log::warn!(
                "Duplicate transaction id {}, reassigned to {}",
                transaction.id,
                next_id
            );
            transaction.id = next_id;
            seen.insert(next_id);
            next_id += 1;
        }
    }

    decoded
}

fn decode_month_vector(value: &Value) -> Option<(MonthVector, bool)> {
    let (repaired, changed) = normalize_month_vector(value);
    let amounts: Vec<Decimal> = serde_json::from_value(repaired).ok()?;
    let vector: MonthVector = amounts.try_into().ok()?;
    Some((vector, changed))
}

/// Decode the year → type → category → months table
pub fn decode_budgets(value: Value) -> BudgetTable {
    let mut table = BudgetTable::new();
    let years = match value {
        Value::Object(years) => years,
        Value::Null => return table,
        other => {
            log::warn!("Ignoring budgets stored as {}", json_kind(&other));
            return table;
        }
    };

    for (year_key, types) in years {
        let Ok(year) = year_key.trim().parse::<i32>() else {
            log::warn!("Ignoring budgets under non-year key '{}'", year_key);
            continue;
        };
        let Value::Object(types) = types else {
            log::warn!("Ignoring malformed budgets for {}", year);
            continue;
        };
        table.insert_year(year);
        for (type_key, categories) in types {
            let Ok(category_type) = type_key.parse::<CategoryType>() else {
                log::warn!("Ignoring budgets of unknown type '{}' in {}", type_key, year);
                continue;
            };
            let Value::Object(categories) = categories else {
                continue;
            };
            for (category, months) in categories {
                match decode_month_vector(&months) {
                    Some((vector, changed)) => {
                        if changed {
                            log::warn!("Repaired budget vector {}/{}/{}", year, category_type, category);
                        }
                        table.insert(year, category_type, &category, vector);
                    }
                    None => log::warn!(
                        "Dropping unreadable budget vector {}/{}/{}",
                        year,
                        category_type,
                        category
                    ),
                }
            }
        }
    }
    table
}

/// Decode the category lists; types missing from the document get their defaults
pub fn decode_categories(value: Value) -> Option<CategoryRegistry> {
    let map = match densify(value) {
        Value::Object(map) => map,
        Value::Null => return None,
        other => {
            log::warn!("Ignoring categories stored as {}", json_kind(&other));
            return None;
        }
    };

    let mut lists: BTreeMap<CategoryType, Vec<String>> = BTreeMap::new();
    for (type_key, names) in map {
        let Ok(category_type) = type_key.parse::<CategoryType>() else {
            log::warn!("Ignoring categories of unknown type '{}'", type_key);
            continue;
        };
        let Value::Array(names) = names else {
            continue;
        };
        lists.insert(
            category_type,
            names
                .into_iter()
                .filter_map(|n| n.as_str().map(str::to_string))
                .collect(),
        );
    }
    for category_type in CategoryType::ALL {
        lists
            .entry(category_type)
            .or_insert_with(|| default_categories(category_type));
    }
    Some(CategoryRegistry::from_lists(lists))
}

/// Decode the opening balances of the savings categories
pub fn decode_epargne_base(value: Value) -> Option<BTreeMap<String, Decimal>> {
    let Value::Object(map) = value else {
        return None;
    };
    let mut base = BTreeMap::new();
    for (category, amount) in map {
        match serde_json::from_value::<Decimal>(amount) {
            Ok(amount) => {
                base.insert(category, amount);
            }
            Err(e) => log::warn!("Dropping opening balance of '{}': {}", category, e),
        }
    }
    Some(base)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ==================== Encoding ====================

pub fn encode_transactions(transactions: &TransactionStore) -> CoreResult<Value> {
    serde_json::to_value(transactions.all()).map_err(|e| {
        StorageError::Serialize {
            message: e.to_string(),
        }
        .into()
    })
}

pub fn encode_budgets(budgets: &BudgetTable) -> CoreResult<Value> {
    let mut years = Map::new();
    for (year, category_type, category, vector) in budgets.entries() {
        let months = serde_json::to_value(vector).map_err(|e| StorageError::Serialize {
            message: e.to_string(),
        })?;
        let types = years
            .entry(year.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(types) = types {
            let categories = types
                .entry(category_type.as_str())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(categories) = categories {
                categories.insert(category.to_string(), months);
            }
        }
    }
    // Years without any vector still exist
    for year in budgets.years() {
        years
            .entry(year.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(Value::Object(years))
}

pub fn encode_categories(registry: &CategoryRegistry) -> Value {
    Value::Object(
        registry
            .iter()
            .map(|(category_type, names)| {
                (
                    category_type.as_str().to_string(),
                    Value::Array(names.iter().cloned().map(Value::String).collect()),
                )
            })
            .collect(),
    )
}

pub fn encode_epargne_base(base: &BTreeMap<String, Decimal>) -> CoreResult<Value> {
    serde_json::to_value(base).map_err(|e| {
        StorageError::Serialize {
            message: e.to_string(),
        }
        .into()
    })
}

// ==================== Snapshots ====================

/// Decoded household parts; `None` where the source had nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub transactions: Option<Vec<Transaction>>,
    pub budgets: Option<BudgetTable>,
    pub registry: Option<CategoryRegistry>,
    pub epargne_base: Option<BTreeMap<String, Decimal>>,
}

impl Snapshot {
    /// Decode a whole-state document (`transactions`, `budgets`, `categories`, `epargneBase`)
    pub fn from_document(document: &Map<String, Value>) -> Self {
        let part = |key: &str| document.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            transactions: part(keys::TRANSACTIONS).map(decode_transactions),
            budgets: part(keys::BUDGETS).map(decode_budgets),
            registry: part(DOCUMENT_CATEGORIES).and_then(decode_categories),
            epargne_base: part(keys::EPARGNE_BASE).and_then(decode_epargne_base),
        }
    }
}

impl Household {
    /// Replace the parts present in the snapshot; returns what changed
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Changes {
        let mut changes = Changes::default();
        if let Some(transactions) = snapshot.transactions {
            self.transactions = TransactionStore::from_vec(transactions);
            changes.transactions = true;
        }
        if let Some(budgets) = snapshot.budgets {
            self.budgets = budgets;
            changes.budgets = true;
        }
        if let Some(registry) = snapshot.registry {
            self.registry = registry;
            changes.categories = true;
        }
        if let Some(base) = snapshot.epargne_base {
            self.epargne_base = base;
            changes.epargne_base = true;
        }
        self.mark(changes);
        changes
    }

    /// Whole state as a document
    pub fn to_document(&self) -> CoreResult<Map<String, Value>> {
        let mut document = Map::new();
        document.insert(
            keys::TRANSACTIONS.to_string(),
            encode_transactions(&self.transactions)?,
        );
        document.insert(keys::BUDGETS.to_string(), encode_budgets(&self.budgets)?);
        document.insert(
            DOCUMENT_CATEGORIES.to_string(),
            encode_categories(&self.registry),
        );
        document.insert(
            keys::EPARGNE_BASE.to_string(),
            encode_epargne_base(&self.epargne_base)?,
        );
        Ok(document)
    }

    fn encode_key(&self, key: &str) -> CoreResult<Option<Value>> {
        Ok(match key {
            keys::TRANSACTIONS => Some(encode_transactions(&self.transactions)?),
            keys::BUDGETS => Some(encode_budgets(&self.budgets)?),
            keys::CATEGORIES => Some(encode_categories(&self.registry)),
            keys::EPARGNE_BASE => Some(encode_epargne_base(&self.epargne_base)?),
            _ => None,
        })
    }
}

// ==================== Store ====================

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Loads and saves a household through a key-value store
pub struct HouseholdStore {
    store: StoreRef,
    last_stamp: AtomicI64,
}

impl HouseholdStore {
    pub fn new(store: StoreRef) -> Self {
        Self {
            store,
            last_stamp: AtomicI64::new(0),
        }
    }

    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Read one key as JSON; corrupt content is logged and treated as absent
    async fn read_key(&self, key: &str) -> CoreResult<Option<Value>> {
        match read_json(self.store.as_ref(), key).await {
            Ok(value) => Ok(value),
            Err(StorageError::Corrupt { key, message }) => {
                log::error!("Corrupt stored '{}', using defaults: {}", key, message);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load the household; absent or corrupt keys fall back to defaults
    pub async fn load(&self, config: &EpargneConfig) -> CoreResult<Household> {
        let transactions = self
            .read_key(keys::TRANSACTIONS)
            .await?
            .map(decode_transactions)
            .unwrap_or_default();
        let budgets = self
            .read_key(keys::BUDGETS)
            .await?
            .map(decode_budgets)
            .unwrap_or_default();
        let registry = self
            .read_key(keys::CATEGORIES)
            .await?
            .and_then(decode_categories)
            .unwrap_or_default();
        let epargne_base = self
            .read_key(keys::EPARGNE_BASE)
            .await?
            .and_then(decode_epargne_base)
            .unwrap_or_else(|| config.base_amounts.clone());

        let stamp = read_last_modified(self.store.as_ref()).await?;
        self.last_stamp.fetch_max(stamp, Ordering::SeqCst);

        log::info!(
            "Loaded {} transactions and {} budget years (lastModified {})",
            transactions.len(),
            budgets.years().count(),
            stamp
        );

        Ok(Household::from_parts(
            registry,
            TransactionStore::from_vec(transactions),
            budgets,
            epargne_base,
            EpargneSettings::from_config(config),
        ))
    }

    /// Next local timestamp, strictly greater than any seen so far
    pub fn next_stamp(&self) -> i64 {
        let now = now_millis();
        let mut previous = self.last_stamp.load(Ordering::SeqCst);
        loop {
            let next = now.max(previous + 1);
            match self.last_stamp.compare_exchange(
                previous,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => previous = actual,
            }
        }
    }

    /// Highest timestamp issued or recorded by this process
    pub fn latest_stamp(&self) -> i64 {
        self.last_stamp.load(Ordering::SeqCst)
    }

    /// Timestamp of the last write known to this store
    pub async fn last_modified(&self) -> CoreResult<i64> {
        Ok(read_last_modified(self.store.as_ref()).await?)
    }

    async fn write_keys(&self, household: &Household, changes: Changes, stamp: i64) -> CoreResult<()> {
        for key in changes.keys() {
            if let Some(value) = household.encode_key(key)? {
                write_json(self.store.as_ref(), key, &value).await?;
            }
        }
        write_last_modified(self.store.as_ref(), stamp).await?;
        self.last_stamp.fetch_max(stamp, Ordering::SeqCst);
        Ok(())
    }

    /// Persist pending changes with a fresh timestamp; `None` when nothing changed
    pub async fn save(&self, household: &mut Household) -> CoreResult<Option<i64>> {
        let changes = household.take_changes();
        if changes.is_empty() {
            return Ok(None);
        }
        let stamp = self.next_stamp();
        self.write_keys(household, changes, stamp).await?;
        log::debug!("Saved {:?} at {}", changes.keys(), stamp);
        Ok(Some(stamp))
    }

    /// Record a timestamp without rewriting any data key
    pub async fn record_stamp(&self, stamp: i64) -> CoreResult<()> {
        write_last_modified(self.store.as_ref(), stamp).await?;
        self.last_stamp.fetch_max(stamp, Ordering::SeqCst);
        Ok(())
    }

    /// Persist everything under a given timestamp, used when adopting a remote state
    pub async fn save_all_at(&self, household: &mut Household, stamp: i64) -> CoreResult<()> {
        household.take_changes();
        self.write_keys(household, Changes::ALL, stamp).await
    }
}
