//! Basic types for the household engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of money flow a category belongs to.
///
/// The set is fixed; only the category lists inside each type are
/// user-editable. Declaration order is the iteration order everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CategoryType {
    /// Income
    Revenus,
    /// Fixed charges (rent, utilities, subscriptions)
    #[serde(rename = "Charges_fixes")]
    ChargesFixes,
    /// Essential variable spending
    Essentiel,
    /// Discretionary spending
    Extras,
    /// Savings pots, deposits and withdrawals
    Epargne,
}

impl CategoryType {
    /// All types in display order
    pub const ALL: [CategoryType; 5] = [
        CategoryType::Revenus,
        CategoryType::ChargesFixes,
        CategoryType::Essentiel,
        CategoryType::Extras,
        CategoryType::Epargne,
    ];

    /// Stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Revenus => "Revenus",
            CategoryType::ChargesFixes => "Charges_fixes",
            CategoryType::Essentiel => "Essentiel",
            CategoryType::Extras => "Extras",
            CategoryType::Epargne => "Epargne",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            CategoryType::ChargesFixes => "Charges fixes",
            other => other.as_str(),
        }
    }

    /// Expense types store their amounts as negatives
    pub fn is_expense(&self) -> bool {
        matches!(
            self,
            CategoryType::ChargesFixes | CategoryType::Essentiel | CategoryType::Extras
        )
    }

    /// Whether an increase between two periods is good news
    pub fn higher_is_better(&self) -> bool {
        matches!(self, CategoryType::Revenus)
    }

    /// Apply the sign convention: expenses are forced negative, others keep their sign
    pub fn normalize_amount(&self, amount: Decimal) -> Decimal {
        if self.is_expense() {
            -amount.abs()
        } else {
            amount
        }
    }
}

impl std::str::FromStr for CategoryType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "revenus" | "revenu" => Ok(CategoryType::Revenus),
            "charges_fixes" | "charges" | "fixes" => Ok(CategoryType::ChargesFixes),
            "essentiel" | "essentiels" => Ok(CategoryType::Essentiel),
            "extras" | "extra" => Ok(CategoryType::Extras),
            "epargne" | "épargne" => Ok(CategoryType::Epargne),
            _ => Err(format!("Invalid category type: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a difference is good or bad news for the household
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Favorability {
    Favorable,
    Unfavorable,
    Neutral,
}

impl Favorability {
    /// Classify a difference, given the direction that counts as good
    pub fn of(diff: Decimal, higher_is_better: bool) -> Self {
        if diff.is_zero() {
            Favorability::Neutral
        } else if (diff > Decimal::ZERO) == higher_is_better {
            Favorability::Favorable
        } else {
            Favorability::Unfavorable
        }
    }
}

impl std::fmt::Display for Favorability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Favorability::Favorable => write!(f, "favorable"),
            Favorability::Unfavorable => write!(f, "unfavorable"),
            Favorability::Neutral => write!(f, "neutral"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_category_type_from_str() {
        assert_eq!("Revenus".parse::<CategoryType>().unwrap(), CategoryType::Revenus);
        assert_eq!("Charges_fixes".parse::<CategoryType>().unwrap(), CategoryType::ChargesFixes);
        assert_eq!("charges fixes".parse::<CategoryType>().unwrap(), CategoryType::ChargesFixes);
        assert_eq!("Épargne".parse::<CategoryType>().unwrap(), CategoryType::Epargne);
        assert!("Loisirs".parse::<CategoryType>().is_err());
    }

    #[test]
    fn test_category_type_serde_names() {
        let json = serde_json::to_string(&CategoryType::ChargesFixes).unwrap();
        assert_eq!(json, "\"Charges_fixes\"");
        let parsed: CategoryType = serde_json::from_str("\"Epargne\"").unwrap();
        assert_eq!(parsed, CategoryType::Epargne);
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(CategoryType::Extras.normalize_amount(dec!(7.26)), dec!(-7.26));
        assert_eq!(CategoryType::Extras.normalize_amount(dec!(-7.26)), dec!(-7.26));
        assert_eq!(CategoryType::Epargne.normalize_amount(dec!(50)), dec!(50));
        assert_eq!(CategoryType::Epargne.normalize_amount(dec!(-50)), dec!(-50));
        assert_eq!(CategoryType::Revenus.normalize_amount(dec!(-3)), dec!(-3));
    }

    #[test]
    fn test_favorability() {
        assert_eq!(Favorability::of(dec!(10), true), Favorability::Favorable);
        assert_eq!(Favorability::of(dec!(-10), true), Favorability::Unfavorable);
        assert_eq!(Favorability::of(dec!(-10), false), Favorability::Favorable);
        assert_eq!(Favorability::of(dec!(10), false), Favorability::Unfavorable);
        assert_eq!(Favorability::of(dec!(0), false), Favorability::Neutral);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CategoryType::ChargesFixes.label(), "Charges fixes");
        assert_eq!(CategoryType::Epargne.to_string(), "Epargne");
        assert!(CategoryType::Essentiel.is_expense());
        assert!(!CategoryType::Epargne.is_expense());
    }
}
