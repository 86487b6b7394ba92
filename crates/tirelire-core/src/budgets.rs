//! Budget table: year → type → category → twelve planned amounts

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tirelire_utils::round_cents;

use crate::categories::CategoryRegistry;
use crate::error::{CoreError, CoreResult};
use crate::types::CategoryType;

/// Planned amounts for January..December
pub type MonthVector = [Decimal; 12];

/// Vector read for any absent entry
pub const ZERO_MONTHS: MonthVector = [Decimal::ZERO; 12];

type TypeBudgets = BTreeMap<CategoryType, BTreeMap<String, MonthVector>>;

fn check_month(month: u32) -> CoreResult<usize> {
    if month > 11 {
        Err(CoreError::InvalidMonth { month })
    } else {
        Ok(month as usize)
    }
}

/// Nested planned amounts. Reads never create entries; writes do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetTable {
    years: BTreeMap<i32, TypeBudgets>,
}

impl BudgetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, year: i32, category_type: CategoryType, category: &str) -> Option<&MonthVector> {
        self.years
            .get(&year)
            .and_then(|types| types.get(&category_type))
            .and_then(|cats| cats.get(category))
    }

    /// Planned vector, twelve zeros when absent
    pub fn months(&self, year: i32, category_type: CategoryType, category: &str) -> MonthVector {
        self.get(year, category_type, category)
            .copied()
            .unwrap_or(ZERO_MONTHS)
    }

    /// One planned cell, zero when absent
    pub fn planned(&self, year: i32, category_type: CategoryType, category: &str, month: u32) -> Decimal {
        self.get(year, category_type, category)
            .and_then(|v| v.get(month as usize))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of the twelve planned cells
    pub fn annual_total(&self, year: i32, category_type: CategoryType, category: &str) -> Decimal {
        self.months(year, category_type, category).iter().sum()
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    /// Every stored vector with its coordinates
    pub fn entries(&self) -> impl Iterator<Item = (i32, CategoryType, &str, &MonthVector)> + '_ {
        self.years.iter().flat_map(|(year, types)| {
            types.iter().flat_map(move |(t, cats)| {
                cats.iter()
                    .map(move |(name, vector)| (*year, *t, name.as_str(), vector))
            })
        })
    }

    fn entry(&mut self, year: i32, category_type: CategoryType, category: &str) -> &mut MonthVector {
        self.years
            .entry(year)
            .or_default()
            .entry(category_type)
            .or_default()
            .entry(category.to_string())
            .or_insert(ZERO_MONTHS)
    }

    /// Record a year even if it holds no vector yet
    pub fn insert_year(&mut self, year: i32) {
        self.years.entry(year).or_default();
    }

    /// Store a whole vector, replacing any previous one
    pub fn insert(&mut self, year: i32, category_type: CategoryType, category: &str, months: MonthVector) {
        *self.entry(year, category_type, category) = months;
    }

    /// Set one cell, rounded to cents
    pub fn set_cell(
        &mut self,
        year: i32,
        category_type: CategoryType,
        category: &str,
        month: u32,
        amount: Decimal,
    ) -> CoreResult<()> {
        let index = check_month(month)?;
        self.entry(year, category_type, category)[index] = round_cents(amount);
        Ok(())
    }

    /// Same amount for all twelve months
    pub fn fill_year(&mut self, year: i32, category_type: CategoryType, category: &str, amount: Decimal) {
        *self.entry(year, category_type, category) = [round_cents(amount); 12];
    }

    /// Copy one month of each listed category into the eleven other months.
    ///
    /// Returns the number of cells written.
    pub fn copy_month(
        &mut self,
        year: i32,
        category_type: CategoryType,
        categories: &[String],
        source_month: u32,
    ) -> CoreResult<usize> {
        let source = check_month(source_month)?;
        let mut written = 0;
        for category in categories {
            let vector = self.entry(year, category_type, category);
            let amount = vector[source];
            for (month, cell) in vector.iter_mut().enumerate() {
                if month != source {
                    *cell = amount;
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    /// Create zero vectors for every registered category of a year.
    ///
    /// Returns false when the year already existed; existing years are left alone.
    pub fn ensure_year(&mut self, year: i32, registry: &CategoryRegistry) -> bool {
        if self.has_year(year) {
            return false;
        }
        for (category_type, names) in registry.iter() {
            for name in names {
                self.entry(year, category_type, name);
            }
        }
        // A registry with no category still records the year
        self.insert_year(year);
        true
    }

    /// Start a new category at zero in every existing year
    pub fn add_category(&mut self, category_type: CategoryType, category: &str) {
        let years: Vec<i32> = self.years().collect();
        for year in years {
            self.insert(year, category_type, category, ZERO_MONTHS);
        }
    }

    /// Move every vector of a category to its new name; returns the years touched
    pub fn rename_category(&mut self, category_type: CategoryType, old: &str, new: &str) -> usize {
        let mut moved = 0;
        for types in self.years.values_mut() {
            if let Some(cats) = types.get_mut(&category_type) {
                if let Some(vector) = cats.remove(old) {
                    cats.insert(new.to_string(), vector);
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Drop every vector of a category; returns the years touched
    pub fn remove_category(&mut self, category_type: CategoryType, category: &str) -> usize {
        let mut removed = 0;
        for types in self.years.values_mut() {
            if let Some(cats) = types.get_mut(&category_type) {
                if cats.remove(category).is_some() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reads_do_not_create() {
        let table = BudgetTable::new();
        assert_eq!(table.months(2025, CategoryType::Extras, "Shopping"), ZERO_MONTHS);
        assert_eq!(table.planned(2025, CategoryType::Extras, "Shopping", 3), dec!(0));
        assert!(!table.has_year(2025));
    }

    #[test]
    fn test_set_cell_rounds() {
        let mut table = BudgetTable::new();
        table
            .set_cell(2025, CategoryType::Extras, "Shopping", 2, dec!(-250.004))
            .unwrap();
        assert_eq!(table.planned(2025, CategoryType::Extras, "Shopping", 2), dec!(-250.00));
        assert_eq!(table.planned(2025, CategoryType::Extras, "Shopping", 1), dec!(0));
        assert!(matches!(
            table.set_cell(2025, CategoryType::Extras, "Shopping", 12, dec!(1)),
            Err(CoreError::InvalidMonth { month: 12 })
        ));
    }

    #[test]
    fn test_fill_and_copy() {
        let mut table = BudgetTable::new();
        table.fill_year(2025, CategoryType::Revenus, "Salaire", dec!(2500));
        assert_eq!(table.annual_total(2025, CategoryType::Revenus, "Salaire"), dec!(30000));

        table
            .set_cell(2025, CategoryType::Essentiel, "Essence", 4, dec!(-120))
            .unwrap();
        let names = vec!["Essence".to_string(), "Gaz".to_string()];
        let written = table
            .copy_month(2025, CategoryType::Essentiel, &names, 4)
            .unwrap();
        assert_eq!(written, 22);
        assert_eq!(table.months(2025, CategoryType::Essentiel, "Essence"), [dec!(-120); 12]);
        assert_eq!(table.months(2025, CategoryType::Essentiel, "Gaz"), ZERO_MONTHS);
    }

    #[test]
    fn test_ensure_year() {
        let registry = CategoryRegistry::default();
        let mut table = BudgetTable::new();
        assert!(table.ensure_year(2026, &registry));
        assert!(table.get(2026, CategoryType::Epargne, "Vacances").is_some());

        table.fill_year(2026, CategoryType::Epargne, "Vacances", dec!(-100));
        assert!(!table.ensure_year(2026, &registry));
        assert_eq!(table.planned(2026, CategoryType::Epargne, "Vacances", 0), dec!(-100));
    }

    #[test]
    fn test_category_cascades() {
        let mut table = BudgetTable::new();
        table.fill_year(2024, CategoryType::Extras, "Bar/Resto", dec!(-80));
        table.fill_year(2025, CategoryType::Extras, "Bar/Resto", dec!(-90));

        assert_eq!(table.rename_category(CategoryType::Extras, "Bar/Resto", "Restos"), 2);
        assert_eq!(table.months(2025, CategoryType::Extras, "Restos"), [dec!(-90); 12]);
        assert!(table.get(2024, CategoryType::Extras, "Bar/Resto").is_none());

        table.add_category(CategoryType::Extras, "Jeux");
        assert!(table.get(2024, CategoryType::Extras, "Jeux").is_some());
        assert!(table.get(2025, CategoryType::Extras, "Jeux").is_some());

        assert_eq!(table.remove_category(CategoryType::Extras, "Restos"), 2);
        assert_eq!(table.entries().count(), 2);
    }
}
