//! CSV export of one year, JSON export and import of the whole household

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tirelire_storage::keys;
use csv::{Terminator, WriterBuilder};
use tirelire_utils::format_decimal_comma;

use crate::error::{CoreError, CoreResult};
use crate::household::{Changes, Household};
use crate::persist::{
    decode_budgets, decode_categories, decode_epargne_base, decode_transactions, Snapshot,
    DOCUMENT_CATEGORIES,
};
use crate::transactions::{SortDirection, SortKey, TransactionFilter, TransactionSort};

/// Version tag written into JSON exports
pub const EXPORT_VERSION: &str = "6.0";

pub const CSV_HEADER: [&str; 5] = ["Date", "Type", "Catégorie", "Montant", "Commentaire"];

const BOM: &str = "\u{FEFF}";

/// Suggested file name for a CSV export
pub fn csv_file_name(year: i32) -> String {
    format!("transactions_{}.csv", year)
}

/// Suggested file name for a JSON export
pub fn json_file_name(at: DateTime<Utc>) -> String {
    format!("budget_backup_{}.json", at.format("%Y-%m-%d"))
}

/// Semicolon-delimited export of one year, oldest first
pub fn export_csv(household: &Household, year: i32) -> CoreResult<String> {
    let filter = TransactionFilter::new().year(year);
    let rows = household
        .transactions()
        .list(&filter, TransactionSort::new(SortKey::Date, SortDirection::Asc));
    if rows.is_empty() {
        return Err(CoreError::NothingToExport { year });
    }

    let mut wtr = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::Any(b'\n'))
        .from_writer(BOM.as_bytes().to_vec());
    wtr.write_record(CSV_HEADER).map_err(csv_failure)?;
    for t in &rows {
        wtr.write_record([
            t.date.format("%d/%m/%Y").to_string(),
            t.category_type.as_str().replace('_', " "),
            t.category.clone(),
            format_decimal_comma(t.amount),
            // Comments never carry the delimiter
            t.comment.replace(';', ","),
        ])
        .map_err(csv_failure)?;
    }

    let bytes = wtr.into_inner().map_err(csv_failure)?;
    let csv = String::from_utf8(bytes).map_err(csv_failure)?;
    log::info!("Exported {} transactions of {} to CSV", rows.len(), year);
    Ok(csv)
}

fn csv_failure(e: impl std::fmt::Display) -> CoreError {
    CoreError::InternalError {
        message: format!("CSV export failed: {}", e),
    }
}

/// Pretty JSON backup of the whole household
pub fn export_json(household: &Household, at: DateTime<Utc>) -> CoreResult<String> {
    let mut document = household.to_document()?;
    document.insert(
        "exportDate".to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    document.insert("version".to_string(), Value::String(EXPORT_VERSION.to_string()));

    serde_json::to_string_pretty(&Value::Object(document)).map_err(|e| CoreError::InternalError {
        message: format!("JSON export failed: {}", e),
    })
}

/// What an import replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub transactions: usize,
    pub budget_years: usize,
    pub categories_replaced: bool,
    pub epargne_base_replaced: bool,
    pub version: Option<String>,
}

fn parse_backup(content: &str) -> CoreResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(CoreError::InvalidFormat {
            message: "backup must be a JSON object".to_string(),
        }),
        Err(e) => Err(CoreError::InvalidFormat {
            message: e.to_string(),
        }),
    }
}

/// Replace the household from a JSON backup.
///
/// Transactions and budgets are always replaced, empty when the backup lacks
/// them. Categories and opening balances are only replaced when present.
/// Nothing changes if the content is not a JSON object.
pub fn import_json(household: &mut Household, content: &str) -> CoreResult<ImportSummary> {
    let document = parse_backup(content)?;
    let part = |key: &str| document.get(key).cloned().unwrap_or(Value::Null);

    let snapshot = Snapshot {
        transactions: Some(decode_transactions(part(keys::TRANSACTIONS))),
        budgets: Some(decode_budgets(part(keys::BUDGETS))),
        registry: decode_categories(part(DOCUMENT_CATEGORIES)),
        epargne_base: decode_epargne_base(part(keys::EPARGNE_BASE)),
    };
    let changes: Changes = household.apply_snapshot(snapshot);

    let summary = ImportSummary {
        transactions: household.transactions().len(),
        budget_years: household.budgets().years().count(),
        categories_replaced: changes.categories,
        epargne_base_replaced: changes.epargne_base,
        version: document
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    log::info!(
        "Imported {} transactions and {} budget years",
        summary.transactions,
        summary.budget_years
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionDraft;
    use crate::types::CategoryType;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use tirelire_config::EpargneConfig;

    fn household() -> Household {
        let mut h = Household::new(&EpargneConfig::default());
        let entries = [
            (2025, 3, 5, CategoryType::Extras, "Shopping", dec!(-7.26), "Vinted; robe"),
            (2025, 3, 1, CategoryType::ChargesFixes, "EDF", dec!(-78.73), ""),
            (2025, 1, 15, CategoryType::Revenus, "Salaire", dec!(2500), "Janvier"),
            (2024, 12, 31, CategoryType::Revenus, "Salaire", dec!(2400), ""),
        ];
        for (y, m, d, t, c, a, comment) in entries {
            h.add_transaction(
                &TransactionDraft::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), t, c, a)
                    .with_comment(comment),
            )
            .unwrap();
        }
        h
    }

    #[test]
    fn test_export_csv() {
        let csv = export_csv(&household(), 2025).unwrap();
        assert!(csv.starts_with('\u{FEFF}'));
        let lines: Vec<&str> = csv.trim_start_matches('\u{FEFF}').lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date;Type;Catégorie;Montant;Commentaire",
                "15/01/2025;Revenus;Salaire;2500,00;Janvier",
                "01/03/2025;Charges fixes;EDF;-78,73;",
                "05/03/2025;Extras;Shopping;-7,26;Vinted, robe",
            ]
        );
        assert_eq!(csv_file_name(2025), "transactions_2025.csv");
    }

    #[test]
    fn test_export_csv_quotes_multiline_comments() {
        let mut h = Household::new(&EpargneConfig::default());
        h.add_transaction(
            &TransactionDraft::new(
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                CategoryType::Extras,
                "Shopping",
                dec!(-12.5),
            )
            .with_comment("cadeau \"anniv\"\npour Léa"),
        )
        .unwrap();

        let csv = export_csv(&h, 2025).unwrap();
        assert!(csv.ends_with("02/06/2025;Extras;Shopping;-12,50;\"cadeau \"\"anniv\"\"\npour Léa\"\n"));
    }

    #[test]
    fn test_export_csv_empty_year() {
        assert!(matches!(
            export_csv(&household(), 2023),
            Err(CoreError::NothingToExport { year: 2023 })
        ));
    }

    #[test]
    fn test_export_json_shape() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let text = export_json(&household(), at).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], "6.0");
        assert_eq!(value["exportDate"], "2025-03-10T12:00:00.000Z");
        assert_eq!(value["transactions"].as_array().unwrap().len(), 4);
        assert!(value["categories"]["Epargne"].is_array());
        assert!(value["epargneBase"].is_object());
        assert!(value["budgets"].is_object());
        assert_eq!(json_file_name(at), "budget_backup_2025-03-10.json");
    }

    #[test]
    fn test_import_replaces_household() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let source = household();
        let text = export_json(&source, at).unwrap();

        let mut target = Household::new(&EpargneConfig::default());
        target.add_category(CategoryType::Extras, "Jeux").unwrap();
        target.take_changes();

        let summary = import_json(&mut target, &text).unwrap();
        assert_eq!(summary.transactions, 4);
        assert!(summary.categories_replaced);
        assert_eq!(summary.version.as_deref(), Some("6.0"));
        assert_eq!(target.transactions(), source.transactions());
        assert!(!target.registry().contains(CategoryType::Extras, "Jeux"));
        assert!(target.take_changes().transactions);
    }

    #[test]
    fn test_import_partial_backup() {
        let mut h = household();
        h.add_category(CategoryType::Extras, "Jeux").unwrap();
        h.fill_budget_year(2025, CategoryType::Extras, "Jeux", dec!(-20))
            .unwrap();

        let summary = import_json(&mut h, r#"{"version": "5.0"}"#).unwrap();
        assert_eq!(summary.transactions, 0);
        assert_eq!(summary.budget_years, 0);
        assert!(!summary.categories_replaced);
        assert!(!summary.epargne_base_replaced);
        assert!(h.registry().contains(CategoryType::Extras, "Jeux"));
    }

    #[test]
    fn test_import_rejects_invalid_content() {
        let mut h = household();
        assert!(matches!(
            import_json(&mut h, "{pas du json"),
            Err(CoreError::InvalidFormat { .. })
        ));
        assert!(matches!(
            import_json(&mut h, "[1, 2]"),
            Err(CoreError::InvalidFormat { .. })
        ));
        assert_eq!(h.transactions().len(), 4);
    }
}
