//! Transaction store with filtering, sorting and entry suggestions

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::budgets::BudgetTable;
use crate::categories::CategoryRegistry;
use crate::error::CoreResult;
use crate::models::{Transaction, TransactionDraft};
use crate::types::CategoryType;

/// Flat collection of transactions, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionStore {
    items: Vec<Transaction>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Transaction>) -> Self {
        Self { items }
    }

    pub fn all(&self) -> &[Transaction] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Transaction> {
        self.items.iter().find(|t| t.id == id)
    }

    /// Identifier for the next record: max + 1, or 1 when empty
    pub fn next_id(&self) -> u64 {
        self.items.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
    }

    /// Validate a draft and append it
    pub fn create(&mut self, draft: &TransactionDraft, registry: &CategoryRegistry) -> CoreResult<Transaction> {
        let (date, category, amount) = draft.validate()?;
        registry.require(draft.category_type, &category)?;
        let transaction = Transaction {
            id: self.next_id(),
            date,
            category_type: draft.category_type,
            category,
            amount,
            comment: draft.comment.trim().to_string(),
        };
        self.items.push(transaction.clone());
        Ok(transaction)
    }

    /// Append without registry check; the amount is still sign-normalized
    pub(crate) fn push_unchecked(
        &mut self,
        date: NaiveDate,
        category_type: CategoryType,
        category: &str,
        amount: Decimal,
        comment: String,
    ) -> u64 {
        let id = self.next_id();
        self.items.push(Transaction {
            id,
            date,
            category_type,
            category: category.to_string(),
            amount: category_type.normalize_amount(amount),
            comment,
        });
        id
    }

    /// Replace the fields of a transaction.
    ///
    /// Validation errors are returned before anything changes; an unknown
    /// id leaves the store untouched and yields `false`.
    pub fn update(&mut self, id: u64, draft: &TransactionDraft, registry: &CategoryRegistry) -> CoreResult<bool> {
        let (date, category, amount) = draft.validate()?;
        registry.require(draft.category_type, &category)?;
        match self.items.iter_mut().find(|t| t.id == id) {
            Some(existing) => {
                existing.date = date;
                existing.category_type = draft.category_type;
                existing.category = category;
                existing.amount = amount;
                existing.comment = draft.comment.trim().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|t| t.id != id);
        self.items.len() != before
    }

    pub(crate) fn find_mut(
        &mut self,
        date: NaiveDate,
        category_type: CategoryType,
        category: &str,
    ) -> Option<&mut Transaction> {
        self.items
            .iter_mut()
            .find(|t| t.date == date && t.is_in(category_type, category))
    }

    /// Number of transactions filed under a category
    pub fn count_for(&self, category_type: CategoryType, category: &str) -> usize {
        self.items
            .iter()
            .filter(|t| t.is_in(category_type, category))
            .count()
    }

    pub fn rename_category(&mut self, category_type: CategoryType, old: &str, new: &str) -> usize {
        let mut moved = 0;
        for transaction in self.items.iter_mut().filter(|t| t.is_in(category_type, old)) {
            transaction.category = new.to_string();
            moved += 1;
        }
        moved
    }

    pub fn remove_category(&mut self, category_type: CategoryType, category: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|t| !t.is_in(category_type, category));
        before - self.items.len()
    }

    /// Transactions matching a filter, in insertion order
    pub fn query<'a, 'f>(
        &'a self,
        filter: &'f TransactionFilter,
    ) -> impl Iterator<Item = &'a Transaction> + 'f
    where
        'a: 'f,
    {
        self.items.iter().filter(move |t| filter.matches(t))
    }

    /// Filtered and sorted view
    pub fn list(&self, filter: &TransactionFilter, sort: TransactionSort) -> Vec<&Transaction> {
        let mut selected: Vec<&Transaction> = self.query(filter).collect();
        sort.apply(&mut selected);
        selected
    }

    /// Comment of the most recent transaction of a category
    pub fn last_comment(&self, category_type: CategoryType, category: &str) -> Option<&str> {
        self.items
            .iter()
            .filter(|t| t.is_in(category_type, category) && !t.comment.is_empty())
            .max_by_key(|t| (t.date, t.id))
            .map(|t| t.comment.as_str())
    }
}

/// Selection criteria; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub year: Option<i32>,
    /// Zero-based month
    pub month: Option<u32>,
    pub category_type: Option<CategoryType>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn category_type(mut self, category_type: CategoryType) -> Self {
        self.category_type = Some(category_type);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        if self.year.is_some_and(|y| transaction.date.year() != y) {
            return false;
        }
        if self.month.is_some_and(|m| transaction.date.month0() != m) {
            return false;
        }
        if self
            .category_type
            .is_some_and(|t| transaction.category_type != t)
        {
            return false;
        }
        if let Some(ref category) = self.category {
            if &transaction.category != category {
                return false;
            }
        }
        if let Some(ref query) = self.search {
            let query = query.trim().to_lowercase();
            if !query.is_empty() && !transaction.search_text().contains(&query) {
                return false;
            }
        }
        true
    }
}

/// Sortable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Type,
    Category,
    Amount,
}

impl std::str::FromStr for SortKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "type" => Ok(SortKey::Type),
            "category" | "categorie" | "catégorie" => Ok(SortKey::Category),
            "amount" | "montant" => Ok(SortKey::Amount),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort order for listings; defaults to date descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl TransactionSort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let ordering = match self.key {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Type => a
                .category_type
                .as_str()
                .to_lowercase()
                .cmp(&b.category_type.as_str().to_lowercase()),
            SortKey::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
            SortKey::Amount => a.amount.cmp(&b.amount),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Stable sort in place
    pub fn apply(&self, items: &mut [&Transaction]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

/// Sum of the amounts of a listing
pub fn filtered_total(items: &[&Transaction]) -> Decimal {
    items.iter().map(|t| t.amount).sum()
}

/// Values proposed while entering a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntrySuggestion {
    /// Planned amount for the month, as a positive figure
    pub amount: Option<Decimal>,
    /// Comment of the latest fixed charge of the same category
    pub comment: Option<String>,
}

/// Suggest an amount from the budget and, for fixed charges, the last comment
pub fn suggest_entry(
    budgets: &BudgetTable,
    transactions: &TransactionStore,
    date: NaiveDate,
    category_type: CategoryType,
    category: &str,
) -> EntrySuggestion {
    let planned = budgets
        .planned(date.year(), category_type, category, date.month0())
        .abs();
    let comment = if category_type == CategoryType::ChargesFixes {
        transactions
            .last_comment(category_type, category)
            .map(str::to_string)
    } else {
        None
    };
    EntrySuggestion {
        amount: (!planned.is_zero()).then_some(planned),
        comment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_store() -> TransactionStore {
        let registry = CategoryRegistry::default();
        let mut store = TransactionStore::new();
        let drafts = [
            TransactionDraft::new(date(2025, 3, 5), CategoryType::Extras, "Shopping", dec!(7.26))
                .with_comment("Livre"),
            TransactionDraft::new(date(2025, 3, 1), CategoryType::Revenus, "Salaire", dec!(2500)),
            TransactionDraft::new(date(2025, 4, 2), CategoryType::Essentiel, "Alimentation", dec!(-85.4))
                .with_comment("Courses"),
            TransactionDraft::new(date(2024, 3, 9), CategoryType::Extras, "Shopping", dec!(-12)),
        ];
        for draft in &drafts {
            store.create(draft, &registry).unwrap();
        }
        store
    }

    #[test]
    fn test_create_assigns_ids_and_normalizes() {
        let store = sample_store();
        assert_eq!(store.len(), 4);
        assert_eq!(store.next_id(), 5);

        let shopping = store.get(1).unwrap();
        assert_eq!(shopping.amount, dec!(-7.26));
        assert_eq!(shopping.comment, "Livre");
    }

    #[test]
    fn test_create_rejects_unknown_category() {
        let registry = CategoryRegistry::default();
        let mut store = TransactionStore::new();
        let draft = TransactionDraft::new(date(2025, 3, 5), CategoryType::Extras, "Loisirs", dec!(1));
        assert!(matches!(
            store.create(&draft, &registry),
            Err(CoreError::CategoryNotFound { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let registry = CategoryRegistry::default();
        let mut store = sample_store();
        let draft = TransactionDraft::new(date(2025, 3, 6), CategoryType::Extras, "Beauté", dec!(20));
        assert!(!store.update(99, &draft, &registry).unwrap());
        assert!(store.update(1, &draft, &registry).unwrap());

        let updated = store.get(1).unwrap();
        assert_eq!(updated.category, "Beauté");
        assert_eq!(updated.amount, dec!(-20));

        let invalid = TransactionDraft::new(date(2025, 3, 6), CategoryType::Extras, "Beauté", dec!(0));
        assert!(store.update(1, &invalid, &registry).is_err());
        assert_eq!(store.get(1).unwrap().amount, dec!(-20));
    }

    #[test]
    fn test_remove() {
        let mut store = sample_store();
        assert!(store.remove(2));
        assert!(!store.remove(2));
        assert_eq!(store.len(), 3);
        assert_eq!(store.next_id(), 5);
    }

    #[test]
    fn test_filter_by_period_and_type() {
        let store = sample_store();
        let march = TransactionFilter::new().year(2025).month(2);
        assert_eq!(store.query(&march).count(), 2);

        let extras = TransactionFilter::new().category_type(CategoryType::Extras);
        assert_eq!(store.query(&extras).count(), 2);

        let shopping_2025 = TransactionFilter::new().year(2025).category("Shopping");
        assert_eq!(store.query(&shopping_2025).count(), 1);
    }

    #[test]
    fn test_search_matches_amount_and_comment() {
        let store = sample_store();
        let by_amount = TransactionFilter::new().search("7.26");
        assert_eq!(store.query(&by_amount).count(), 1);

        let by_comment = TransactionFilter::new().search("  COURSES ");
        assert_eq!(store.query(&by_comment).count(), 1);

        let blank = TransactionFilter::new().search("   ");
        assert_eq!(store.query(&blank).count(), 4);
    }

    #[test]
    fn test_sorting() {
        let store = sample_store();
        let filter = TransactionFilter::new();

        let by_date = store.list(&filter, TransactionSort::default());
        assert_eq!(by_date[0].date, date(2025, 4, 2));
        assert_eq!(by_date[3].date, date(2024, 3, 9));

        let by_amount = store.list(&filter, TransactionSort::new(SortKey::Amount, SortDirection::Asc));
        assert_eq!(by_amount[0].amount, dec!(-85.4));
        assert_eq!(by_amount[3].amount, dec!(2500));

        let by_type = store.list(&filter, TransactionSort::new(SortKey::Type, SortDirection::Asc));
        assert_eq!(by_type[0].category_type, CategoryType::Essentiel);

        assert_eq!(filtered_total(&by_date), dec!(2395.34));
    }

    #[test]
    fn test_list_outlives_filter() {
        let store = sample_store();
        let listed = {
            let filter = TransactionFilter::new().year(2025);
            store.list(&filter, TransactionSort::new(SortKey::Date, SortDirection::Asc))
        };
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2].date, date(2025, 4, 2));
    }

    #[test]
    fn test_category_cascades() {
        let mut store = sample_store();
        assert_eq!(store.count_for(CategoryType::Extras, "Shopping"), 2);
        assert_eq!(store.rename_category(CategoryType::Extras, "Shopping", "Achats"), 2);
        assert_eq!(store.count_for(CategoryType::Extras, "Achats"), 2);
        assert_eq!(store.remove_category(CategoryType::Extras, "Achats"), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_suggest_entry() {
        let registry = CategoryRegistry::default();
        let mut store = TransactionStore::new();
        let mut budgets = BudgetTable::new();
        budgets
            .set_cell(2025, CategoryType::ChargesFixes, "EDF", 2, dec!(-95))
            .unwrap();
        store
            .create(
                &TransactionDraft::new(date(2025, 1, 10), CategoryType::ChargesFixes, "EDF", dec!(90))
                    .with_comment("Prélèvement janvier"),
                &registry,
            )
            .unwrap();
        store
            .create(
                &TransactionDraft::new(date(2025, 2, 10), CategoryType::ChargesFixes, "EDF", dec!(92))
                    .with_comment("Prélèvement février"),
                &registry,
            )
            .unwrap();

        let suggestion = suggest_entry(&budgets, &store, date(2025, 3, 10), CategoryType::ChargesFixes, "EDF");
        assert_eq!(suggestion.amount, Some(dec!(95)));
        assert_eq!(suggestion.comment.as_deref(), Some("Prélèvement février"));

        let none = suggest_entry(&budgets, &store, date(2025, 4, 10), CategoryType::Extras, "Shopping");
        assert_eq!(none, EntrySuggestion::default());
    }

    proptest! {
        #[test]
        fn test_expense_amounts_never_positive(cents in -1_000_000i64..1_000_000i64, idx in 0usize..3) {
            prop_assume!(cents != 0);
            let category_type = [CategoryType::ChargesFixes, CategoryType::Essentiel, CategoryType::Extras][idx];
            let registry = CategoryRegistry::default();
            let category = registry.categories(category_type)[0].clone();
            let mut store = TransactionStore::new();
            let draft = TransactionDraft::new(date(2025, 6, 1), category_type, category, Decimal::new(cents, 2));
            let created = store.create(&draft, &registry).unwrap();
            prop_assert!(created.amount < Decimal::ZERO);
            prop_assert_eq!(created.amount.abs(), Decimal::new(cents, 2).abs());
        }
    }
}
