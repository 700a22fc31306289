use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Weekday};
use models::{CategoryStats, DataSummary, DateSpan, Transaction, TxnType, WeeklyBucket};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Totals, count and time span of a transaction set.
///
/// An empty set spans "now" to "now". Totals saturate at `Decimal::MAX`.
pub fn generate_data_summary(txns: &[Transaction]) -> DataSummary {
    generate_data_summary_at(txns, Local::now().naive_local())
}

/// Same as [`generate_data_summary`] with an explicit clock for the empty case.
pub fn generate_data_summary_at(txns: &[Transaction], now: NaiveDateTime) -> DataSummary {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    for t in txns {
        match t.kind {
            TxnType::Income => total_income = total_income.saturating_add(t.amount),
            TxnType::Expense => total_expense = total_expense.saturating_add(t.amount),
        }
    }

    let start = txns.iter().map(|t| t.transaction_time).min().unwrap_or(now);
    let end = txns.iter().map(|t| t.transaction_time).max().unwrap_or(now);

    DataSummary {
        total_income,
        total_expense,
        net_income: total_income - total_expense,
        transaction_count: txns.len(),
        date_range: DateSpan { start, end },
    }
}

/// Per-category totals for one transaction type, largest first.
///
/// Equal amounts are ordered by count (descending) and then by category name.
pub fn generate_category_stats(txns: &[Transaction], kind: TxnType) -> Vec<CategoryStats> {
    let mut groups: HashMap<&str, (Decimal, usize)> = HashMap::new();
    let mut total = Decimal::ZERO;

    for t in txns.iter().filter(|t| t.kind == kind) {
        let entry = groups.entry(t.category.as_str()).or_insert((Decimal::ZERO, 0));
        entry.0 = entry.0.saturating_add(t.amount);
        entry.1 += 1;
        total = total.saturating_add(t.amount);
    }

    let mut stats: Vec<CategoryStats> = groups
        .into_iter()
        .map(|(category, (amount, count))| {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (amount / total * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
            };
            CategoryStats {
                category: category.to_string(),
                amount,
                count,
                percentage: round2(percentage),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.category.cmp(&b.category))
    });
    stats
}

/// Income and expense per ISO week (Monday start), oldest week first.
/// Weeks without transactions are not emitted.
pub fn generate_weekly_series(txns: &[Transaction]) -> Vec<WeeklyBucket> {
    let mut buckets: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();

    for t in txns {
        let week = t.transaction_time.date().iso_week();
        let entry = buckets
            .entry((week.year(), week.week()))
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        match t.kind {
            TxnType::Income => entry.0 = entry.0.saturating_add(t.amount),
            TxnType::Expense => entry.1 = entry.1.saturating_add(t.amount),
        }
    }

    buckets
        .into_iter()
        .filter_map(|((iso_year, week_number), (income, expense))| {
            let week_start = NaiveDate::from_isoywd_opt(iso_year, week_number, Weekday::Mon)?;
            Some(WeeklyBucket {
                week: format!("{}-W{:02}", iso_year, week_number),
                iso_year,
                week_number,
                week_start,
                income,
                expense,
            })
        })
        .collect()
}
