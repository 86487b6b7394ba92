//! Household budget state and the engines computed from it
//!
//! A [`Household`] owns the category registry, the transactions, the budget
//! table and the savings opening balances. Every derived figure (monthly
//! stats, savings roll-ups, dashboard, comparisons) is computed on demand
//! through an [`Aggregator`] borrowed from it.

pub mod aggregation;
pub mod budgets;
pub mod categories;
pub mod comparison;
pub mod error;
pub mod export;
pub mod household;
pub mod models;
pub mod persist;
pub mod reports;
pub mod sample;
pub mod solde;
pub mod time;
pub mod transactions;
pub mod types;

pub use aggregation::{
    Aggregator, CategoryAmount, CategoryStats, DisplayedEcart, EpargneRollup, MonthFlows,
    MonthlyStats, RollupSource, Stats, TypeStats,
};
pub use budgets::{BudgetTable, MonthVector, ZERO_MONTHS};
pub use categories::{default_categories, CategoryRegistry, SOLDE_CATEGORY};
pub use comparison::{default_periods, Comparison, ComparisonRow};
pub use error::{log_error, CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use export::{export_csv, export_json, import_json, ImportSummary};
pub use household::{
    CategoryRemoval, CategoryRename, Changes, EpargneSettings, Household, RemovalOutcome,
};
pub use models::{Transaction, TransactionDraft};
pub use persist::{now_millis, HouseholdStore, Snapshot};
pub use reports::{
    BudgetOverview, BudgetProgress, CategoryOverview, Dashboard, ProgressLevel, TypeOverview,
};
pub use solde::CarryForward;
pub use time::{Period, PeriodFilter, YearMonth};
pub use transactions::{
    filtered_total, suggest_entry, EntrySuggestion, SortDirection, SortKey, TransactionFilter,
    TransactionSort, TransactionStore,
};
pub use types::{CategoryType, Favorability};
