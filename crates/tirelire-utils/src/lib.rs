//! Utility functions and helpers

use rust_decimal::{Decimal, RoundingStrategy};

/// French month names, index = zero-based month
pub const MONTHS_FULL: [&str; 12] = [
    "Janvier", "Février", "Mars", "Avril", "Mai", "Juin", "Juillet", "Août", "Septembre",
    "Octobre", "Novembre", "Décembre",
];

/// Abbreviated French month names
pub const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jun", "Jul", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

/// Full month name for a zero-based month
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS_FULL.get(month as usize).copied()
}

/// Abbreviated month name for a zero-based month
pub fn month_short_name(month: u32) -> Option<&'static str> {
    MONTHS_SHORT.get(month as usize).copied()
}

/// Round a monetary amount to cents, halves away from zero
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Group the digits of an integer string by thousands
pub fn group_thousands(digits: &str, separator: char) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push(separator);
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Format an amount the French way: `-1 234,56`
pub fn format_amount(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{},{}", sign, group_thousands(int_part, ' '), frac_part)
}

/// Two decimals with a decimal comma and no grouping: `-7,26`
pub fn format_decimal_comma(amount: Decimal) -> String {
    format!("{:.2}", round_cents(amount)).replace('.', ",")
}
