//! Plain-text rendering of the household reports

use serde::Serialize;
use tirelire_core::{
    BudgetOverview, CarryForward, CategoryRegistry, CategoryType, Comparison, Dashboard,
    Favorability, MonthlyStats, ProgressLevel, Transaction, TransactionStore,
};
use tirelire_utils::{format_amount, month_short_name};

use rust_decimal::Decimal;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn euros(amount: Decimal) -> String {
    format!("{} €", format_amount(amount))
}

fn marker(favorability: Favorability) -> &'static str {
    match favorability {
        Favorability::Favorable => "+",
        Favorability::Unfavorable => "!",
        Favorability::Neutral => " ",
    }
}

fn progress_label(level: ProgressLevel) -> &'static str {
    match level {
        ProgressLevel::Normal => "ok",
        ProgressLevel::Warning => "attention",
        ProgressLevel::Danger => "dépassé",
    }
}

fn heading(title: &str) {
    println!("\n{}", title);
    println!("{}", "-".repeat(title.chars().count()));
}

pub fn print_dashboard(dashboard: &Dashboard) {
    heading(&format!("Tableau de bord {}", dashboard.period.long_label()));
    println!("{:<24}{:>16}", "Revenus", euros(dashboard.revenus));
    println!(
        "{:<24}{:>16}   prévu {}",
        "Dépenses",
        euros(dashboard.depenses_reel),
        euros(dashboard.depenses_prevu)
    );
    println!("{:<24}{:>16}", "Fixes restants", euros(dashboard.fixes_restant));
    println!("{:<24}{:>16}", "Solde disponible", euros(dashboard.solde_disponible));
    println!("{:<24}{:>16}", "Solde CCP", euros(dashboard.solde_ccp));
    println!("{:<24}{:>16}", "LDDS", euros(dashboard.solde_ldds));
    println!("{:<24}{:>16}", "Livret A", euros(dashboard.solde_livret_a));
    println!(
        "{:<24}{:>15.0} %   {}",
        "Budget consommé",
        dashboard.progress.percent,
        progress_label(dashboard.progress.level)
    );

    heading(&format!("Épargne prévue {}", dashboard.period.year));
    for pot in &dashboard.epargne_budget {
        println!("  {:<22}{:>16}", pot.name, euros(pot.amount));
    }
    println!("  {:<22}{:>16}", "Total", euros(dashboard.epargne_budget_total));

    heading("Solde CCP par mois");
    for (month, solde) in dashboard.solde_series.iter().enumerate() {
        println!(
            "  {:<6}{:>16}",
            month_short_name(month as u32).unwrap_or("?"),
            euros(*solde)
        );
    }
}

pub fn print_stats(stats: &MonthlyStats) {
    heading(&format!("Réel / prévu {}", stats.period.long_label()));
    for type_stats in &stats.types {
        let t = type_stats.category_type;
        let ecart = type_stats.stats.displayed_ecart(t);
        println!(
            "{:<24}{:>14}{:>14}{:>14} {}",
            t.label(),
            euros(type_stats.stats.reel),
            euros(type_stats.stats.prevu),
            euros(ecart.value),
            marker(ecart.status)
        );
        for category in &type_stats.categories {
            if category.stats.reel.is_zero() && category.stats.prevu.is_zero() {
                continue;
            }
            let ecart = category.stats.displayed_ecart(t);
            println!(
                "  {:<22}{:>14}{:>14}{:>14} {}",
                category.name,
                euros(category.stats.reel),
                euros(category.stats.prevu),
                euros(ecart.value),
                marker(ecart.status)
            );
        }
    }
    println!("\n{:<24}{:>14}", "Montant disponible", euros(stats.montant_disponible));
}

pub fn print_transactions(items: &[&Transaction], total: Decimal) {
    for t in items {
        println!(
            "#{:<5} {}  {:<14} {:<20} {:>14}  {}",
            t.id,
            t.date.format("%d/%m/%Y"),
            t.category_type.label(),
            t.category,
            euros(t.amount),
            t.comment
        );
    }
    println!("{} transaction(s), total {}", items.len(), euros(total));
}

pub fn print_transaction(label: &str, t: &Transaction) {
    println!(
        "{} #{}: {} {} / {} {}",
        label,
        t.id,
        t.date.format("%d/%m/%Y"),
        t.category_type.label(),
        t.category,
        euros(t.amount)
    );
}

pub fn print_budget_overview(overview: &BudgetOverview) {
    for type_overview in &overview.types {
        heading(&format!(
            "{} {}",
            type_overview.category_type.label(),
            overview.year
        ));
        for category in &type_overview.categories {
            println!(
                "  {:<22} prévu {:>14}   réel {:>14}",
                category.name,
                euros(category.annual_planned),
                euros(category.annual_actual)
            );
        }
        println!(
            "  {:<22} prévu {:>14}   réel {:>14}",
            "Total",
            euros(type_overview.annual_planned),
            euros(type_overview.annual_actual)
        );
    }
}

pub fn print_categories(registry: &CategoryRegistry, transactions: &TransactionStore) {
    for (category_type, names) in registry.iter() {
        heading(category_type.label());
        for name in names {
            println!(
                "  {:<24}{:>5} transaction(s)",
                name,
                transactions.count_for(category_type, name)
            );
        }
    }
}

pub fn print_comparison(comparison: &Comparison) {
    heading(&format!("{} vs {}", comparison.label1, comparison.label2));
    println!(
        "{:<16}{:>14}{:>14}{:>14}{:>9}",
        "", comparison.label1, comparison.label2, "Écart", "%"
    );
    for row in &comparison.rows {
        println!(
            "{:<16}{:>14}{:>14}{:>14}{:>8.1}% {}",
            row.category_type.label(),
            euros(row.val1),
            euros(row.val2),
            euros(row.diff),
            row.pct,
            marker(row.favorability())
        );
    }
}

pub fn print_epargne(
    year: i32,
    budget: &[tirelire_core::CategoryAmount],
    reel: &[tirelire_core::CategoryAmount],
) {
    heading(&format!("Épargne cumulée {}", year));
    println!("  {:<22}{:>16}{:>16}", "", "Prévu", "Réel");
    for (planned, actual) in budget.iter().zip(reel) {
        println!(
            "  {:<22}{:>16}{:>16}",
            planned.name,
            euros(planned.amount),
            euros(actual.amount)
        );
    }
}

pub fn print_carry_forward(result: &CarryForward) {
    match result.replaced {
        Some(previous) => println!(
            "Report du {} mis à jour: {} (était {})",
            result.date.format("%d/%m/%Y"),
            euros(result.amount),
            euros(previous)
        ),
        None => println!(
            "Report créé au {}: {} (transaction #{})",
            result.date.format("%d/%m/%Y"),
            euros(result.amount),
            result.id
        ),
    }
}

/// One line per type, used after a category listing changes
pub fn print_type_names(category_type: CategoryType, names: &[String]) {
    println!("{}: {}", category_type.label(), names.join(", "));
}
