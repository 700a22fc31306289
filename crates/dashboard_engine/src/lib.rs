use anyhow::Result;
use chrono::Local;
use models::{CategoryStats, DataSummary, Transaction, TxnType, WeeklyBucket};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::info;

pub mod aggregation;
pub mod export;
pub mod filter;

pub use aggregation::{
    generate_category_stats, generate_data_summary, generate_data_summary_at, generate_weekly_series,
};
pub use export::{build_export_snapshot, build_export_snapshot_at, date_range_label, write_export_json};
pub use filter::filter_by_date_range;

#[derive(Debug, Serialize)]
pub struct DashboardMetadata {
    pub generated_at: String,
    pub currency: String,
}

/// Every derived view of one transaction set, as consumed by the dashboard page.
#[derive(Debug, Serialize)]
pub struct DashboardOutput {
    pub metadata: DashboardMetadata,
    pub summary: DataSummary,
    pub expense_categories: Vec<CategoryStats>,
    pub income_categories: Vec<CategoryStats>,
    pub weekly: Vec<WeeklyBucket>,
}

pub fn generate_dashboard(txns: &[Transaction]) -> DashboardOutput {
    DashboardOutput {
        metadata: DashboardMetadata {
            generated_at: Local::now().to_rfc3339(),
            currency: models::CURRENCY.to_string(),
        },
        summary: generate_data_summary(txns),
        expense_categories: generate_category_stats(txns, TxnType::Expense),
        income_categories: generate_category_stats(txns, TxnType::Income),
        weekly: generate_weekly_series(txns),
    }
}

pub fn write_dashboard_json(output: &DashboardOutput, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(output)?;
    fs::write(out_path, json)?;
    info!(path = %out_path.display(), "dashboard written");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, NaiveDateTime};
    use models::{Source, Transaction, TxnType};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    pub fn txn(time: NaiveDateTime, amount: Decimal, kind: TxnType, category: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            transaction_time: time,
            category: category.to_string(),
            counterparty: String::new(),
            description: format!("{} {}", category, time),
            kind,
            amount,
            payment_method: String::new(),
            source: Source::Alipay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, txn};
    use rust_decimal_macros::dec;

    #[test]
    fn test_generate_dashboard_collects_every_view() {
        let txns = vec![
            txn(at(2025, 3, 3, 9), dec!(100), TxnType::Income, "工资"),
            txn(at(2025, 3, 4, 9), dec!(20), TxnType::Expense, "餐饮美食"),
            txn(at(2025, 3, 12, 9), dec!(5), TxnType::Expense, "交通出行"),
        ];
        let out = generate_dashboard(&txns);
        assert_eq!(out.summary.transaction_count, 3);
        assert_eq!(out.expense_categories.len(), 2);
        assert_eq!(out.income_categories.len(), 1);
        assert_eq!(out.weekly.len(), 2);
        assert_eq!(out.metadata.currency, "CNY");
    }
}
