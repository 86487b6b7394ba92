//! The household state and every mutation applied to it
//!
//! A single [`Household`] value owns the registry, the transactions, the
//! budget table and the savings opening balances. Every mutating operation
//! validates first, then applies, then records which persisted keys it
//! touched so the caller can save exactly those.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tirelire_config::EpargneConfig;
use tirelire_storage::keys;

use crate::aggregation::Aggregator;
use crate::budgets::BudgetTable;
use crate::categories::CategoryRegistry;
use crate::error::CoreResult;
use crate::models::{Transaction, TransactionDraft};
use crate::transactions::TransactionStore;
use crate::types::CategoryType;

/// Savings settings that do not travel with the data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpargneSettings {
    /// Year the opening balances are anchored at
    pub base_year: i32,
    /// Categories held on the LDDS-like account
    pub ldds: Vec<String>,
    /// Categories held on the Livret A-like account
    pub livret_a: Vec<String>,
}

impl EpargneSettings {
    pub fn from_config(config: &EpargneConfig) -> Self {
        Self {
            base_year: config.base_year,
            ldds: config.ldds.clone(),
            livret_a: config.livret_a.clone(),
        }
    }
}

impl Default for EpargneSettings {
    fn default() -> Self {
        Self::from_config(&EpargneConfig::default())
    }
}

/// Which persisted keys a mutation touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub transactions: bool,
    pub budgets: bool,
    pub categories: bool,
    pub epargne_base: bool,
}

impl Changes {
    pub const ALL: Changes = Changes {
        transactions: true,
        budgets: true,
        categories: true,
        epargne_base: true,
    };

    pub fn is_empty(&self) -> bool {
        *self == Changes::default()
    }

    pub fn merge(&mut self, other: Changes) {
        self.transactions |= other.transactions;
        self.budgets |= other.budgets;
        self.categories |= other.categories;
        self.epargne_base |= other.epargne_base;
    }

    /// Storage keys to rewrite
    pub fn keys(&self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.transactions {
            changed.push(keys::TRANSACTIONS);
        }
        if self.budgets {
            changed.push(keys::BUDGETS);
        }
        if self.categories {
            changed.push(keys::CATEGORIES);
        }
        if self.epargne_base {
            changed.push(keys::EPARGNE_BASE);
        }
        changed
    }
}

/// Outcome of a category rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRename {
    pub name: String,
    pub transactions: usize,
    pub budget_years: usize,
}

/// A category removal waiting for confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRemoval {
    pub category_type: CategoryType,
    pub name: String,
    /// Transactions that will be deleted along with the category
    pub transactions: usize,
}

/// Outcome of a committed category removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub transactions: usize,
    pub budget_years: usize,
}

/// Complete household state
#[derive(Debug, Clone)]
pub struct Household {
    pub(crate) registry: CategoryRegistry,
    pub(crate) transactions: TransactionStore,
    pub(crate) budgets: BudgetTable,
    pub(crate) epargne_base: BTreeMap<String, Decimal>,
    settings: EpargneSettings,
    pending: Changes,
}

impl Household {
    /// Empty household with the default registry and the configured balances
    pub fn new(config: &EpargneConfig) -> Self {
        Self {
            registry: CategoryRegistry::default(),
            transactions: TransactionStore::new(),
            budgets: BudgetTable::new(),
            epargne_base: config.base_amounts.clone(),
            settings: EpargneSettings::from_config(config),
            pending: Changes::default(),
        }
    }

    /// Assemble from already-validated parts
    pub fn from_parts(
        registry: CategoryRegistry,
        transactions: TransactionStore,
        budgets: BudgetTable,
        epargne_base: BTreeMap<String, Decimal>,
        settings: EpargneSettings,
    ) -> Self {
        Self {
            registry,
            transactions,
            budgets,
            epargne_base,
            settings,
            pending: Changes::default(),
        }
    }

    // ==================== Accessors ====================

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }

    pub fn budgets(&self) -> &BudgetTable {
        &self.budgets
    }

    pub fn epargne_base(&self) -> &BTreeMap<String, Decimal> {
        &self.epargne_base
    }

    pub fn settings(&self) -> &EpargneSettings {
        &self.settings
    }

    /// Read-only computation view
    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(
            &self.registry,
            &self.transactions,
            &self.budgets,
            &self.epargne_base,
            self.settings.base_year,
        )
    }

    // ==================== Change tracking ====================

    pub(crate) fn mark(&mut self, changes: Changes) {
        self.pending.merge(changes);
    }

    /// Changes since the last call
    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    // ==================== Transactions ====================

    pub fn add_transaction(&mut self, draft: &TransactionDraft) -> CoreResult<Transaction> {
        let created = self.transactions.create(draft, &self.registry)?;
        log::info!(
            "Added transaction #{} {}/{} {}",
            created.id,
            created.category_type,
            created.category,
            created.amount
        );
        self.mark(Changes {
            transactions: true,
            ..Changes::default()
        });
        Ok(created)
    }

    /// Update a transaction; `false` when the id is unknown
    pub fn update_transaction(&mut self, id: u64, draft: &TransactionDraft) -> CoreResult<bool> {
        let updated = self.transactions.update(id, draft, &self.registry)?;
        if updated {
            log::info!("Updated transaction #{}", id);
            self.mark(Changes {
                transactions: true,
                ..Changes::default()
            });
        } else {
            log::debug!("Update ignored, no transaction #{}", id);
        }
        Ok(updated)
    }

    pub fn delete_transaction(&mut self, id: u64) -> bool {
        let removed = self.transactions.remove(id);
        if removed {
            log::info!("Deleted transaction #{}", id);
            self.mark(Changes {
                transactions: true,
                ..Changes::default()
            });
        }
        removed
    }

    // ==================== Categories ====================

    /// Register a category and start it at zero in every budget year
    pub fn add_category(&mut self, category_type: CategoryType, name: &str) -> CoreResult<String> {
        let name = self.registry.add(category_type, name)?;
        self.budgets.add_category(category_type, &name);
        log::info!("Added category {}/{}", category_type, name);
        self.mark(Changes {
            categories: true,
            budgets: true,
            ..Changes::default()
        });
        Ok(name)
    }

    /// Rename a category along with its transactions and budget vectors
    pub fn rename_category(
        &mut self,
        category_type: CategoryType,
        old: &str,
        new: &str,
    ) -> CoreResult<CategoryRename> {
        let name = self.registry.rename(category_type, old, new)?;
        let transactions = self.transactions.rename_category(category_type, old, &name);
        let budget_years = self.budgets.rename_category(category_type, old, &name);
        log::info!(
            "Renamed category {}/{} to '{}' ({} transactions, {} budget years)",
            category_type,
            old,
            name,
            transactions,
            budget_years
        );
        self.mark(Changes {
            transactions: transactions > 0,
            budgets: budget_years > 0,
            categories: true,
            ..Changes::default()
        });
        Ok(CategoryRename {
            name,
            transactions,
            budget_years,
        })
    }

    /// First phase of a removal: report what would be deleted
    pub fn plan_category_removal(
        &self,
        category_type: CategoryType,
        name: &str,
    ) -> CoreResult<CategoryRemoval> {
        self.registry.require(category_type, name)?;
        Ok(CategoryRemoval {
            category_type,
            name: name.to_string(),
            transactions: self.transactions.count_for(category_type, name),
        })
    }

    /// Second phase of a removal: delete the category and everything filed under it
    pub fn commit_category_removal(&mut self, plan: &CategoryRemoval) -> CoreResult<RemovalOutcome> {
        self.registry.remove(plan.category_type, &plan.name)?;
        let transactions = self
            .transactions
            .remove_category(plan.category_type, &plan.name);
        let budget_years = self
            .budgets
            .remove_category(plan.category_type, &plan.name);
        if transactions != plan.transactions {
            log::warn!(
                "Removal of {}/{} deleted {} transactions, {} were announced",
                plan.category_type,
                plan.name,
                transactions,
                plan.transactions
            );
        }
        log::info!(
            "Removed category {}/{} ({} transactions, {} budget years)",
            plan.category_type,
            plan.name,
            transactions,
            budget_years
        );
        self.mark(Changes {
            transactions: transactions > 0,
            budgets: budget_years > 0,
            categories: true,
            ..Changes::default()
        });
        Ok(RemovalOutcome {
            transactions,
            budget_years,
        })
    }

    /// Restore the default category lists; data filed under removed names is kept
    pub fn reset_categories(&mut self) {
        self.registry.reset();
        log::info!("Categories reset to defaults");
        self.mark(Changes {
            categories: true,
            ..Changes::default()
        });
    }

    // ==================== Budgets ====================

    fn budget_changed(&mut self) {
        self.mark(Changes {
            budgets: true,
            ..Changes::default()
        });
    }

    pub fn set_budget_cell(
        &mut self,
        year: i32,
        category_type: CategoryType,
        category: &str,
        month: u32,
        amount: Decimal,
    ) -> CoreResult<()> {
        self.registry.require(category_type, category)?;
        self.budgets
            .set_cell(year, category_type, category, month, amount)?;
        self.budget_changed();
        Ok(())
    }

    pub fn fill_budget_year(
        &mut self,
        year: i32,
        category_type: CategoryType,
        category: &str,
        amount: Decimal,
    ) -> CoreResult<()> {
        self.registry.require(category_type, category)?;
        self.budgets.fill_year(year, category_type, category, amount);
        self.budget_changed();
        Ok(())
    }

    /// Copy one month of every category of a type to the other months
    pub fn copy_budget_month(
        &mut self,
        year: i32,
        category_type: CategoryType,
        source_month: u32,
    ) -> CoreResult<usize> {
        let categories = self.registry.categories(category_type).to_vec();
        let written = self
            .budgets
            .copy_month(year, category_type, &categories, source_month)?;
        log::info!(
            "Copied month {} of {} {} into {} cells",
            source_month + 1,
            category_type,
            year,
            written
        );
        self.budget_changed();
        Ok(written)
    }

    /// Create the budget year if absent; returns whether it was created
    pub fn ensure_budget_year(&mut self, year: i32) -> bool {
        let created = self.budgets.ensure_year(year, &self.registry);
        if created {
            log::info!("Initialized budgets for {}", year);
            self.budget_changed();
        }
        created
    }

    // ==================== Savings ====================

    /// Set or clear the opening balance of a savings category
    pub fn set_epargne_base(&mut self, category: &str, amount: Option<Decimal>) -> CoreResult<()> {
        self.registry.require(CategoryType::Epargne, category)?;
        match amount {
            Some(amount) => {
                self.epargne_base.insert(category.to_string(), amount);
            }
            None => {
                self.epargne_base.remove(category);
            }
        }
        self.mark(Changes {
            epargne_base: true,
            ..Changes::default()
        });
        Ok(())
    }
}
