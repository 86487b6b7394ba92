//! Data models for the household state

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::time::{Period, PeriodFilter, YearMonth};
use crate::types::CategoryType;

/// A recorded money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier, assigned as max(existing) + 1
    pub id: u64,
    /// Calendar date (YYYY-MM-DD when stored)
    pub date: NaiveDate,
    /// Category type
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    /// Category name within the type
    pub category: String,
    /// Signed amount; never positive for expense types
    pub amount: Decimal,
    /// Free text
    #[serde(default)]
    pub comment: String,
}

impl Transaction {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Zero-based month
    pub fn month(&self) -> u32 {
        self.date.month0()
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    /// Check if the transaction belongs to a category
    pub fn is_in(&self, category_type: CategoryType, category: &str) -> bool {
        self.category_type == category_type && self.category == category
    }

    /// Lowercased text matched by free-text search
    pub fn search_text(&self) -> String {
        format!("{} {} {:.2}", self.category, self.comment, self.amount.abs()).to_lowercase()
    }
}

impl PeriodFilter for Transaction {
    fn in_period(&self, period: &Period) -> bool {
        period.contains(&self.date)
    }
}

/// User input for creating or updating a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub date: Option<NaiveDate>,
    pub category_type: CategoryType,
    pub category: String,
    pub amount: Decimal,
    pub comment: String,
}

impl TransactionDraft {
    pub fn new(
        date: NaiveDate,
        category_type: CategoryType,
        category: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            date: Some(date),
            category_type,
            category: category.into(),
            amount,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Check the required fields and apply the sign convention.
    ///
    /// Returns the validated date, trimmed category and normalized amount.
    pub fn validate(&self) -> CoreResult<(NaiveDate, String, Decimal)> {
        let date = self
            .date
            .ok_or_else(|| CoreError::validation("La date est obligatoire"))?;
        let category = self.category.trim();
        if category.is_empty() {
            return Err(CoreError::validation("La catégorie est obligatoire"));
        }
        if self.amount.is_zero() {
            return Err(CoreError::validation("Le montant doit être différent de zéro"));
        }
        Ok((
            date,
            category.to_string(),
            self.category_type.normalize_amount(self.amount),
        ))
    }
}
