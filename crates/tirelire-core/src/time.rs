//! Calendar periods used to select transactions and budget cells

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tirelire_utils::{month_name, month_short_name};

use crate::error::{CoreError, CoreResult};

/// A calendar month; `month` is zero-based (0 = January)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, rejecting indices outside 0..12
    pub fn new(year: i32, month: u32) -> CoreResult<Self> {
        if month > 11 {
            return Err(CoreError::InvalidMonth { month });
        }
        Ok(Self { year, month })
    }

    /// Month containing a date
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    /// Current month (UTC)
    pub fn current() -> Self {
        Self::of(Utc::now().date_naive())
    }

    /// Zero-based month index
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Following month, December rolls into January of the next year
    pub fn next(&self) -> Self {
        if self.month == 11 {
            Self {
                year: self.year + 1,
                month: 0,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Previous month, January rolls back into December of the previous year
    pub fn prev(&self) -> Self {
        if self.month == 0 {
            Self {
                year: self.year - 1,
                month: 11,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> CoreResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1).ok_or_else(|| {
            CoreError::validation(format!("Date hors limites: {}-{}", self.year, self.month + 1))
        })
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month
    }

    /// Short label, e.g. "Mar 2025"
    pub fn label(&self) -> String {
        format!("{} {}", month_short_name(self.month).unwrap_or("?"), self.year)
    }

    /// Full French label, e.g. "Mars 2025"
    pub fn long_label(&self) -> String {
        format!("{} {}", month_name(self.month).unwrap_or("?"), self.year)
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month + 1)
    }
}

/// Either a single month or a whole year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Month(YearMonth),
    Year(i32),
}

impl Period {
    pub fn contains(&self, date: &NaiveDate) -> bool {
        match self {
            Period::Month(ym) => ym.contains(date),
            Period::Year(year) => date.year() == *year,
        }
    }

    /// Label shown in comparison headers
    pub fn label(&self) -> String {
        match self {
            Period::Month(ym) => ym.label(),
            Period::Year(year) => year.to_string(),
        }
    }

    /// Year the period falls in
    pub fn year(&self) -> i32 {
        match self {
            Period::Month(ym) => ym.year,
            Period::Year(year) => *year,
        }
    }
}

/// Items that can be selected by calendar period
pub trait PeriodFilter {
    fn in_period(&self, period: &Period) -> bool;
}

impl PeriodFilter for NaiveDate {
    fn in_period(&self, period: &Period) -> bool {
        period.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_month_bounds() {
        assert!(YearMonth::new(2025, 0).is_ok());
        assert!(YearMonth::new(2025, 11).is_ok());
        assert!(matches!(
            YearMonth::new(2025, 12),
            Err(CoreError::InvalidMonth { month: 12 })
        ));
    }

    #[test]
    fn test_next_and_prev_roll_over_years() {
        let dec = YearMonth::new(2025, 11).unwrap();
        assert_eq!(dec.next(), YearMonth::new(2026, 0).unwrap());
        assert_eq!(dec.next().prev(), dec);

        let jan = YearMonth::new(2025, 0).unwrap();
        assert_eq!(jan.prev(), YearMonth::new(2024, 11).unwrap());
    }

    #[test]
    fn test_contains_uses_zero_based_month() {
        let march = YearMonth::new(2025, 2).unwrap();
        assert!(march.contains(&date(2025, 3, 5)));
        assert!(!march.contains(&date(2025, 2, 28)));
        assert!(!march.contains(&date(2024, 3, 5)));
        assert_eq!(YearMonth::of(date(2025, 3, 5)), march);
    }

    #[test]
    fn test_labels() {
        let march = YearMonth::new(2025, 2).unwrap();
        assert_eq!(march.label(), "Mar 2025");
        assert_eq!(march.long_label(), "Mars 2025");
        assert_eq!(march.to_string(), "2025-03");
        assert_eq!(Period::Year(2024).label(), "2024");
        assert_eq!(Period::Month(march).label(), "Mar 2025");
    }

    #[test]
    fn test_period_filter() {
        let d = date(2025, 12, 31);
        assert!(d.in_period(&Period::Year(2025)));
        assert!(!d.in_period(&Period::Year(2026)));
        assert!(d.in_period(&Period::Month(YearMonth::new(2025, 11).unwrap())));
        assert_eq!(YearMonth::new(2025, 11).unwrap().first_day().unwrap(), date(2025, 12, 1));
    }
}
