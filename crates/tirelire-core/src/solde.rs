//! Carry a month's checking balance into the next month

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::categories::SOLDE_CATEGORY;
use crate::error::CoreResult;
use crate::household::{Changes, Household};
use crate::time::YearMonth;
use crate::types::CategoryType;

/// Result of a carry-forward
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarryForward {
    /// Transaction holding the carried balance
    pub id: u64,
    pub date: NaiveDate,
    pub amount: Decimal,
    /// False when an existing carry-forward was overwritten
    pub created: bool,
    /// Previous amount of the overwritten transaction
    pub replaced: Option<Decimal>,
}

/// Comment written on carry-forward transactions
pub fn carry_forward_comment(from: YearMonth) -> String {
    format!("Report automatique depuis {}", from.long_label())
}

impl Household {
    /// Existing carry-forward transaction into the month after `from`
    pub fn pending_carry_forward(&self, from: YearMonth) -> CoreResult<Option<Decimal>> {
        let date = from.next().first_day()?;
        Ok(self
            .transactions
            .all()
            .iter()
            .find(|t| t.date == date && t.is_in(CategoryType::Revenus, SOLDE_CATEGORY))
            .map(|t| t.amount))
    }

    /// Record `solde` as the opening income of the month after `from`.
    ///
    /// There is at most one such transaction per target date: a rerun
    /// overwrites its amount and comment. The registry is not consulted.
    pub fn carry_forward(&mut self, from: YearMonth, solde: Decimal) -> CoreResult<CarryForward> {
        let target = from.next();
        let date = target.first_day()?;
        let comment = carry_forward_comment(from);

        if let Some(existing) = self
            .transactions
            .find_mut(date, CategoryType::Revenus, SOLDE_CATEGORY)
        {
            let replaced = existing.amount;
            existing.amount = solde;
            existing.comment = comment;
            let id = existing.id;
            log::info!(
                "Updated carry-forward #{} for {}: {} -> {}",
                id,
                target,
                replaced,
                solde
            );
            self.mark(Changes {
                transactions: true,
                ..Changes::default()
            });
            return Ok(CarryForward {
                id,
                date,
                amount: solde,
                created: false,
                replaced: Some(replaced),
            });
        }

        self.ensure_budget_year(target.year);
        let id = self.transactions.push_unchecked(
            date,
            CategoryType::Revenus,
            SOLDE_CATEGORY,
            solde,
            comment,
        );
        log::info!("Created carry-forward #{} for {}: {}", id, target, solde);
        self.mark(Changes {
            transactions: true,
            ..Changes::default()
        });
        Ok(CarryForward {
            id,
            date,
            amount: solde,
            created: true,
            replaced: None,
        })
    }

    /// Carry the computed solde CCP of `from` forward
    pub fn report_solde(&mut self, from: YearMonth) -> CoreResult<CarryForward> {
        let solde = self.aggregator().month_flows(from).solde_ccp();
        self.carry_forward(from, solde)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionDraft;
    use rust_decimal_macros::dec;
    use tirelire_config::EpargneConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let mut h = Household::new(&EpargneConfig::default());
        let december = YearMonth::new(2025, 11).unwrap();

        let first = h.carry_forward(december, dec!(412.5)).unwrap();
        assert!(first.created);
        assert_eq!(first.date, date(2026, 1, 1));
        assert!(h.budgets().has_year(2026));

        let tx = h.transactions().get(first.id).unwrap();
        assert_eq!(tx.category, SOLDE_CATEGORY);
        assert_eq!(tx.comment, "Report automatique depuis Décembre 2025");

        let second = h.carry_forward(december, dec!(300)).unwrap();
        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.replaced, Some(dec!(412.5)));
        assert_eq!(h.transactions().len(), 1);
        assert_eq!(h.transactions().get(first.id).unwrap().amount, dec!(300));
    }

    #[test]
    fn test_report_solde_uses_month_flows() {
        let mut h = Household::new(&EpargneConfig::default());
        h.add_transaction(&TransactionDraft::new(
            date(2025, 3, 1),
            CategoryType::Revenus,
            "Salaire",
            dec!(2000),
        ))
        .unwrap();
        h.add_transaction(&TransactionDraft::new(
            date(2025, 3, 2),
            CategoryType::Essentiel,
            "Alimentation",
            dec!(-250),
        ))
        .unwrap();

        let march = YearMonth::new(2025, 2).unwrap();
        assert_eq!(h.pending_carry_forward(march).unwrap(), None);
        let report = h.report_solde(march).unwrap();
        assert_eq!(report.amount, dec!(1750));
        assert_eq!(report.date, date(2025, 4, 1));
        assert_eq!(h.pending_carry_forward(march).unwrap(), Some(dec!(1750)));
    }

    #[test]
    fn test_negative_solde_bypasses_registry() {
        let mut h = Household::new(&EpargneConfig::default());
        let plan = h
            .plan_category_removal(CategoryType::Revenus, SOLDE_CATEGORY)
            .unwrap();
        h.commit_category_removal(&plan).unwrap();

        let report = h
            .carry_forward(YearMonth::new(2025, 4).unwrap(), dec!(-80))
            .unwrap();
        assert_eq!(h.transactions().get(report.id).unwrap().amount, dec!(-80));
    }
}
