//! Report structures: dashboard figures and the annual budget overview

use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregation::{sum_named, Aggregator, CategoryAmount, MonthlyStats, RollupSource};
use crate::budgets::{MonthVector, ZERO_MONTHS};
use crate::household::Household;
use crate::time::YearMonth;
use crate::types::CategoryType;

/// Spending progress thresholds, in percent of the plan
const WARNING_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
const DANGER_PERCENT: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressLevel {
    Normal,
    Warning,
    Danger,
}

/// Real expenses against planned expenses for a month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetProgress {
    pub spent: Decimal,
    pub planned: Decimal,
    /// Uncapped; zero when nothing is planned
    pub percent: Decimal,
    pub level: ProgressLevel,
}

impl BudgetProgress {
    pub fn new(spent: Decimal, planned: Decimal) -> Self {
        let percent = if planned > Decimal::ZERO {
            spent / planned * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let level = if percent >= DANGER_PERCENT {
            ProgressLevel::Danger
        } else if percent >= WARNING_PERCENT {
            ProgressLevel::Warning
        } else {
            ProgressLevel::Normal
        };
        Self {
            spent,
            planned,
            percent,
            level,
        }
    }
}

/// Dashboard figures for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub period: YearMonth,
    pub stats: MonthlyStats,
    pub revenus: Decimal,
    /// Absolute real spending over the three expense types
    pub depenses_reel: Decimal,
    pub depenses_prevu: Decimal,
    /// Planned fixed charges not yet paid
    pub fixes_restant: Decimal,
    /// Income minus planned fixed charges, real variable spending and net savings
    pub solde_disponible: Decimal,
    pub solde_ccp: Decimal,
    pub solde_ldds: Decimal,
    pub solde_livret_a: Decimal,
    pub progress: BudgetProgress,
    pub epargne_budget: Vec<CategoryAmount>,
    pub epargne_budget_total: Decimal,
    /// Solde CCP of every month of the year
    pub solde_series: [Decimal; 12],
}

/// Planned and actual figures of one category over a year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOverview {
    pub name: String,
    pub planned: MonthVector,
    pub actual: MonthVector,
    /// Twelve-month sum; the savings roll-up for Epargne
    pub annual_planned: Decimal,
    pub annual_actual: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeOverview {
    pub category_type: CategoryType,
    pub categories: Vec<CategoryOverview>,
    /// Signed for Revenus and Epargne, absolute for expense types
    pub monthly_planned: MonthVector,
    pub monthly_actual: MonthVector,
    pub annual_planned: Decimal,
    pub annual_actual: Decimal,
}

/// The budget table of a year with actuals alongside
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetOverview {
    pub year: i32,
    pub types: Vec<TypeOverview>,
}

impl BudgetOverview {
    pub fn get(&self, category_type: CategoryType) -> Option<&TypeOverview> {
        self.types.iter().find(|t| t.category_type == category_type)
    }
}

impl<'a> Aggregator<'a> {
    /// Compute the dashboard; `ldds` and `livret_a` name the categories of each pot
    pub fn dashboard(&self, period: YearMonth, ldds: &[String], livret_a: &[String]) -> Dashboard {
        let stats = self.calculate_stats(period);
        let flows = self.month_flows(period);

        let revenus = stats.totals(CategoryType::Revenus).reel;
        let charges = stats.totals(CategoryType::ChargesFixes);
        let essentiel = stats.totals(CategoryType::Essentiel);
        let extras = stats.totals(CategoryType::Extras);

        let depenses_reel = charges.reel.abs() + essentiel.reel.abs() + extras.reel.abs();
        let depenses_prevu = charges.prevu.abs() + essentiel.prevu.abs() + extras.prevu.abs();

        let solde_disponible = revenus
            - charges.prevu.abs()
            - essentiel.reel.abs()
            - extras.reel.abs()
            - flows.epargne_nette;
        let solde_ccp = revenus
            - charges.reel.abs()
            - essentiel.reel.abs()
            - extras.reel.abs()
            - flows.epargne_nette;

        let epargne_reel = self.annual_epargne_reel(period.year);
        let epargne_budget = self.annual_epargne_budget(period.year);
        let epargne_budget_total = epargne_budget.iter().map(|a| a.amount).sum();

        Dashboard {
            period,
            revenus,
            depenses_reel,
            depenses_prevu,
            fixes_restant: charges.prevu.abs() - charges.reel.abs(),
            solde_disponible,
            solde_ccp,
            solde_ldds: sum_named(&epargne_reel, ldds),
            solde_livret_a: sum_named(&epargne_reel, livret_a),
            progress: BudgetProgress::new(depenses_reel, depenses_prevu),
            epargne_budget,
            epargne_budget_total,
            solde_series: self.solde_ccp_series(period.year),
            stats,
        }
    }

    /// Planned and actual amounts of every registered category for a year
    pub fn budget_overview(&self, year: i32) -> BudgetOverview {
        let mut planned_rollup = self.epargne_rollup(RollupSource::Budget);
        let mut actual_rollup = self.epargne_rollup(RollupSource::Actual);

        let mut actuals: std::collections::HashMap<(CategoryType, &str), MonthVector> =
            std::collections::HashMap::new();
        for transaction in self.transactions.all() {
            if transaction.year() == year {
                actuals
                    .entry((transaction.category_type, transaction.category.as_str()))
                    .or_insert(ZERO_MONTHS)[transaction.month() as usize] += transaction.amount;
            }
        }

        let mut types = Vec::with_capacity(CategoryType::ALL.len());
        for (category_type, names) in self.registry.iter() {
            let signed = !category_type.is_expense();
            let mut monthly_planned = ZERO_MONTHS;
            let mut monthly_actual = ZERO_MONTHS;
            let mut annual_planned = Decimal::ZERO;
            let mut annual_actual = Decimal::ZERO;
            let mut categories = Vec::with_capacity(names.len());

            for name in names {
                let planned = self.budgets.months(year, category_type, name);
                let actual = actuals
                    .get(&(category_type, name.as_str()))
                    .copied()
                    .unwrap_or(ZERO_MONTHS);

                for month in 0..12 {
                    if signed {
                        monthly_planned[month] += planned[month];
                        monthly_actual[month] += actual[month];
                    } else {
                        monthly_planned[month] += planned[month].abs();
                        monthly_actual[month] += actual[month].abs();
                    }
                }

                let (category_planned, category_actual) = if category_type == CategoryType::Epargne {
                    (
                        planned_rollup.category(year, name),
                        actual_rollup.category(year, name),
                    )
                } else {
                    (planned.iter().sum(), actual.iter().sum())
                };
                annual_planned += category_planned.abs();
                annual_actual += category_actual;

                categories.push(CategoryOverview {
                    name: name.clone(),
                    planned,
                    actual,
                    annual_planned: category_planned,
                    annual_actual: category_actual,
                });
            }

            types.push(TypeOverview {
                category_type,
                categories,
                monthly_planned,
                monthly_actual,
                annual_planned,
                annual_actual,
            });
        }

        BudgetOverview { year, types }
    }
}

impl Household {
    /// Dashboard using the configured savings pots
    pub fn dashboard(&self, period: YearMonth) -> Dashboard {
        let settings = self.settings();
        self.aggregator()
            .dashboard(period, &settings.ldds, &settings.livret_a)
    }

    pub fn budget_overview(&self, year: i32) -> BudgetOverview {
        self.aggregator().budget_overview(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionDraft;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tirelire_config::EpargneConfig;

    fn add(h: &mut Household, m: u32, d: u32, t: CategoryType, category: &str, amount: Decimal) {
        h.add_transaction(&TransactionDraft::new(
            NaiveDate::from_ymd_opt(2025, m, d).unwrap(),
            t,
            category,
            amount,
        ))
        .unwrap();
    }

    fn march() -> YearMonth {
        YearMonth::new(2025, 2).unwrap()
    }

    fn sample() -> Household {
        let mut h = Household::new(&EpargneConfig::default());
        add(&mut h, 3, 4, CategoryType::Revenus, "Salaire", dec!(1643.76));
        add(&mut h, 3, 4, CategoryType::Revenus, "Autres revenus", dec!(855.24));
        add(&mut h, 3, 5, CategoryType::Extras, "Shopping", dec!(-7.26));
        add(&mut h, 3, 1, CategoryType::Essentiel, "Tabac", dec!(-53));
        add(&mut h, 3, 1, CategoryType::Essentiel, "Alimentation", dec!(-210.90));
        add(&mut h, 3, 1, CategoryType::Epargne, "Fin de mois", dec!(-856.24));
        h.set_budget_cell(2025, CategoryType::ChargesFixes, "EDF", 2, dec!(-78.73))
            .unwrap();
        h.set_budget_cell(2025, CategoryType::ChargesFixes, "Mutuelle", 2, dec!(-100))
            .unwrap();
        h.set_budget_cell(2025, CategoryType::Essentiel, "Alimentation", 2, dec!(-250))
            .unwrap();
        h.set_budget_cell(2025, CategoryType::Extras, "Shopping", 2, dec!(-100))
            .unwrap();
        h.set_budget_cell(2025, CategoryType::Epargne, "Santé", 2, dec!(-379.77))
            .unwrap();
        h
    }

    #[test]
    fn test_dashboard_figures() {
        let h = sample();
        let dash = h.dashboard(march());

        assert_eq!(dash.revenus, dec!(2499.00));
        assert_eq!(dash.depenses_reel, dec!(271.16));
        assert_eq!(dash.depenses_prevu, dec!(528.73));
        assert_eq!(dash.fixes_restant, dec!(178.73));
        // 2499 - 178.73 - 263.90 - 7.26 + 856.24
        assert_eq!(dash.solde_disponible, dec!(2905.35));
        // 2499 - 0 - 263.90 - 7.26 + 856.24
        assert_eq!(dash.solde_ccp, dec!(3084.08));
        assert_eq!(dash.solde_series[2], dash.solde_ccp);

        // Fin de mois 3870.83 - 856.24, Pets/Home/Auto 165.3
        assert_eq!(dash.solde_ldds, dec!(3179.89));
        // Santé 379.77 + Urgences 203.5
        assert_eq!(dash.solde_livret_a, dec!(583.27));

        assert_eq!(dash.progress.level, ProgressLevel::Normal);
        let sante = dash
            .epargne_budget
            .iter()
            .find(|a| a.name == "Santé")
            .unwrap();
        assert_eq!(sante.amount, dec!(0));
        assert_eq!(
            dash.epargne_budget_total,
            dec!(3870.83) + dec!(165.3) + dec!(203.5)
        );
    }

    #[test]
    fn test_pot_ignores_removed_category() {
        let mut h = sample();
        add(&mut h, 3, 6, CategoryType::Epargne, "Vacances", dec!(100));
        assert_eq!(h.dashboard(march()).solde_ldds, dec!(3279.89));

        let plan = h
            .plan_category_removal(CategoryType::Epargne, "Vacances")
            .unwrap();
        h.commit_category_removal(&plan).unwrap();

        let dash = h.dashboard(march());
        // Fin de mois 3014.59 + Pets/Home/Auto 165.3 + Anniv/Noël 0
        assert_eq!(dash.solde_ldds, dec!(3179.89));
        assert_eq!(dash.solde_livret_a, dec!(583.27));
    }

    #[test]
    fn test_pot_ignores_renamed_category() {
        let mut h = sample();
        h.rename_category(CategoryType::Epargne, "Fin de mois", "Réserve")
            .unwrap();

        let dash = h.dashboard(march());
        // Only Pets/Home/Auto is still listed under its configured name
        assert_eq!(dash.solde_ldds, dec!(165.3));
        assert_eq!(dash.solde_livret_a, dec!(583.27));
    }

    #[test]
    fn test_progress_levels() {
        assert_eq!(BudgetProgress::new(dec!(10), dec!(0)).percent, dec!(0));
        assert_eq!(BudgetProgress::new(dec!(79), dec!(100)).level, ProgressLevel::Normal);
        assert_eq!(BudgetProgress::new(dec!(80), dec!(100)).level, ProgressLevel::Warning);
        assert_eq!(BudgetProgress::new(dec!(100), dec!(100)).level, ProgressLevel::Danger);
        assert_eq!(BudgetProgress::new(dec!(150), dec!(100)).percent, dec!(150));
    }

    #[test]
    fn test_budget_overview() {
        let h = sample();
        let overview = h.budget_overview(2025);
        assert_eq!(overview.types.len(), 5);

        let essentiel = overview.get(CategoryType::Essentiel).unwrap();
        assert_eq!(essentiel.monthly_planned[2], dec!(250));
        assert_eq!(essentiel.monthly_actual[2], dec!(263.90));
        assert_eq!(essentiel.annual_planned, dec!(250));

        let epargne = overview.get(CategoryType::Epargne).unwrap();
        assert_eq!(epargne.monthly_actual[2], dec!(-856.24));
        let fin_de_mois = epargne
            .categories
            .iter()
            .find(|c| c.name == "Fin de mois")
            .unwrap();
        assert_eq!(fin_de_mois.annual_actual, dec!(3014.59));
        assert_eq!(fin_de_mois.annual_planned, dec!(3870.83));
    }
}
