use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use models::{ExportSnapshot, Transaction, CURRENCY};
use std::{fs, path::Path};
use tracing::info;

use crate::aggregation::generate_data_summary;

/// Freezes one transaction slice into the document handed to the exporter.
pub fn build_export_snapshot(txns: &[Transaction]) -> ExportSnapshot {
    build_export_snapshot_at(txns, Local::now())
}

pub fn build_export_snapshot_at(txns: &[Transaction], generated_at: DateTime<Local>) -> ExportSnapshot {
    let summary = generate_data_summary(txns);
    ExportSnapshot {
        generated_at: generated_at.to_rfc3339(),
        currency: CURRENCY.to_string(),
        total_income: summary.total_income,
        total_expense: summary.total_expense,
        net_income: summary.net_income,
        transaction_count: summary.transaction_count,
        date_range_label: date_range_label(txns),
        transactions: txns.to_vec(),
    }
}

/// `2025/3/1 - 2025/3/31`, a single day when first and last coincide, empty without data.
pub fn date_range_label(txns: &[Transaction]) -> String {
    let days = txns.iter().map(|t| t.transaction_time.date());
    let (Some(first), Some(last)) = (days.clone().min(), days.max()) else {
        return String::new();
    };

    if first == last {
        short_date(first)
    } else {
        format!("{} - {}", short_date(first), short_date(last))
    }
}

fn short_date(d: NaiveDate) -> String {
    format!("{}/{}/{}", d.year(), d.month(), d.day())
}

pub fn write_export_json(snapshot: &ExportSnapshot, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating export directory {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(out_path, json).with_context(|| format!("Writing {}", out_path.display()))?;
    info!(
        path = %out_path.display(),
        transactions = snapshot.transaction_count,
        "export written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, txn};
    use models::TxnType;
    use rust_decimal_macros::dec;

    #[test]
    fn test_date_range_label() {
        assert_eq!(date_range_label(&[]), "");

        let one_day = vec![
            txn(at(2025, 3, 1, 9), dec!(1), TxnType::Expense, "a"),
            txn(at(2025, 3, 1, 18), dec!(1), TxnType::Expense, "a"),
        ];
        assert_eq!(date_range_label(&one_day), "2025/3/1");

        let span = vec![
            txn(at(2025, 3, 31, 9), dec!(1), TxnType::Expense, "a"),
            txn(at(2025, 3, 1, 9), dec!(1), TxnType::Expense, "a"),
        ];
        assert_eq!(date_range_label(&span), "2025/3/1 - 2025/3/31");
    }

    #[test]
    fn test_snapshot_is_consistent_with_its_transactions() {
        let txns = vec![
            txn(at(2025, 3, 2, 9), dec!(200), TxnType::Income, "红包"),
            txn(at(2025, 3, 1, 9), dec!(35.5), TxnType::Expense, "餐饮美食"),
        ];
        let snapshot = build_export_snapshot(&txns);
        assert_eq!(snapshot.currency, "CNY");
        assert_eq!(snapshot.total_income, dec!(200));
        assert_eq!(snapshot.total_expense, dec!(35.5));
        assert_eq!(snapshot.net_income, dec!(164.5));
        assert_eq!(snapshot.transaction_count, snapshot.transactions.len());
        assert_eq!(snapshot.date_range_label, "2025/3/1 - 2025/3/2");
    }

    #[test]
    fn test_write_export_json_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("report.json");
        let snapshot = build_export_snapshot(&[txn(at(2025, 3, 1, 9), dec!(1), TxnType::Expense, "a")]);

        write_export_json(&snapshot, &path).unwrap();

        let back: ExportSnapshot = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, snapshot);
    }
}
