//! Side-by-side comparison of two periods

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregation::Aggregator;
use crate::error::CoreResult;
use crate::time::{Period, PeriodFilter, YearMonth};
use crate::types::{CategoryType, Favorability};

/// Per-type comparison of two periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub category_type: CategoryType,
    pub val1: Decimal,
    pub val2: Decimal,
    /// `val1 - val2`
    pub diff: Decimal,
    /// `diff / val2 * 100`, zero when `val2` is zero
    pub pct: Decimal,
    pub higher_is_better: bool,
}

impl ComparisonRow {
    pub fn new(category_type: CategoryType, val1: Decimal, val2: Decimal) -> Self {
        let diff = val1 - val2;
        let pct = if val2.is_zero() {
            Decimal::ZERO
        } else {
            diff / val2 * Decimal::ONE_HUNDRED
        };
        Self {
            category_type,
            val1,
            val2,
            diff,
            pct,
            higher_is_better: category_type.higher_is_better(),
        }
    }

    pub fn favorability(&self) -> Favorability {
        Favorability::of(self.diff, self.higher_is_better)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub first: Period,
    pub second: Period,
    pub label1: String,
    pub label2: String,
    /// One row per type, in display order
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn row(&self, category_type: CategoryType) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.category_type == category_type)
    }
}

/// Current month against the previous one
pub fn default_periods(current: YearMonth) -> (Period, Period) {
    (Period::Month(current), Period::Month(current.prev()))
}

impl<'a> Aggregator<'a> {
    /// Sum of absolute amounts per type over registered categories
    pub fn period_totals(&self, period: &Period) -> BTreeMap<CategoryType, Decimal> {
        let mut totals: BTreeMap<CategoryType, Decimal> =
            CategoryType::ALL.iter().map(|t| (*t, Decimal::ZERO)).collect();
        for transaction in self.transactions.all() {
            if transaction.in_period(period)
                && self
                    .registry
                    .contains(transaction.category_type, &transaction.category)
            {
                *totals.entry(transaction.category_type).or_default() += transaction.amount.abs();
            }
        }
        totals
    }

    pub fn compare(&self, first: Period, second: Period) -> Comparison {
        let totals1 = self.period_totals(&first);
        let totals2 = self.period_totals(&second);
        let rows = CategoryType::ALL
            .iter()
            .map(|t| {
                ComparisonRow::new(
                    *t,
                    totals1.get(t).copied().unwrap_or_default(),
                    totals2.get(t).copied().unwrap_or_default(),
                )
            })
            .collect();
        Comparison {
            first,
            second,
            label1: first.label(),
            label2: second.label(),
            rows,
        }
    }

    /// Compare two months; months are zero-based
    pub fn compare_month(&self, y1: i32, m1: u32, y2: i32, m2: u32) -> CoreResult<Comparison> {
        Ok(self.compare(
            Period::Month(YearMonth::new(y1, m1)?),
            Period::Month(YearMonth::new(y2, m2)?),
        ))
    }

    pub fn compare_year(&self, y1: i32, y2: i32) -> Comparison {
        self.compare(Period::Year(y1), Period::Year(y2))
    }
}
