//! Demonstration data for a fresh household

use chrono::Datelike;
use rust_decimal::Decimal;

use crate::error::CoreResult;
use crate::household::Household;
use crate::models::TransactionDraft;
use crate::time::YearMonth;
use crate::types::CategoryType;

const SAMPLE_TRANSACTIONS: [(u32, CategoryType, &str, i64, &str); 6] = [
    (5, CategoryType::Extras, "Shopping", -726, "Vinted"),
    (4, CategoryType::Revenus, "Autres revenus", 85524, "LDDS"),
    (4, CategoryType::Revenus, "Salaire", 164376, "Pole emploi"),
    (1, CategoryType::Essentiel, "Tabac", -5300, ""),
    (1, CategoryType::Essentiel, "Alimentation", -21090, "Aldi"),
    (1, CategoryType::Epargne, "Fin de mois", -85624, "Ajustement"),
];

const SAMPLE_BUDGETS: [(CategoryType, &str, i64); 7] = [
    (CategoryType::Revenus, "Salaire", 164376),
    (CategoryType::ChargesFixes, "EDF", -7873),
    (CategoryType::ChargesFixes, "Mutuelle", -10000),
    (CategoryType::Essentiel, "Alimentation", -25000),
    (CategoryType::Extras, "Shopping", -10000),
    (CategoryType::Epargne, "Santé", -37977),
    (CategoryType::Epargne, "Anniv/Noël", -5000),
];

impl Household {
    /// Add a handful of transactions and planned amounts in `month`.
    ///
    /// Uses the default category names; fails without touching anything if
    /// one was removed.
    pub fn seed_sample(&mut self, month: YearMonth) -> CoreResult<()> {
        let first = month.first_day()?;
        let wanted = SAMPLE_TRANSACTIONS
            .iter()
            .map(|(_, t, c, _, _)| (*t, *c))
            .chain(SAMPLE_BUDGETS.iter().map(|(t, c, _)| (*t, *c)));
        for (category_type, category) in wanted {
            self.registry().require(category_type, category)?;
        }

        self.ensure_budget_year(month.year);

        for (day, category_type, category, cents, comment) in SAMPLE_TRANSACTIONS {
            let date = first.with_day(day).unwrap_or(first);
            self.add_transaction(
                &TransactionDraft::new(date, category_type, category, Decimal::new(cents, 2))
                    .with_comment(comment),
            )?;
        }
        for (category_type, category, cents) in SAMPLE_BUDGETS {
            self.set_budget_cell(
                month.year,
                category_type,
                category,
                month.month(),
                Decimal::new(cents, 2),
            )?;
        }

        log::info!("Seeded sample data for {}", month);
        Ok(())
    }
}
