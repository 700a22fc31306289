use chrono::NaiveDateTime;
use models::{MergeMode, Transaction, TxnType};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Combines a freshly parsed batch with what is already loaded.
///
/// `Replace` keeps only `incoming`; `Cumulative` appends it after `existing`. The
/// combined list is then deduplicated (first occurrence wins) and sorted with the
/// most recent transaction first.
///
/// # Example
/// ```no_run
/// use models::MergeMode;
/// use utils::merge_transactions;
///
/// let (merged, stats) = merge_transactions(&[], Vec::new(), MergeMode::Cumulative);
/// println!("Added: {}, Skipped: {}", stats.added, stats.skipped);
/// assert!(merged.is_empty());
/// ```
pub fn merge_transactions(
    existing: &[Transaction],
    incoming: Vec<Transaction>,
    mode: MergeMode,
) -> (Vec<Transaction>, MergeStats) {
    let total = incoming.len();

    // Existing records come first, so only their own duplicates can displace them
    let (mut combined, existing_kept) = match mode {
        MergeMode::Replace => (incoming, 0),
        MergeMode::Cumulative => {
            let kept = existing.iter().map(build_signature).collect::<HashSet<_>>().len();
            let mut all = Vec::with_capacity(existing.len() + incoming.len());
            all.extend_from_slice(existing);
            all.extend(incoming);
            (all, kept)
        }
    };

    dedup_transactions_by_signature(&mut combined);
    sort_transactions_by_time(&mut combined);

    let added = combined.len() - existing_kept;
    let stats = MergeStats {
        added,
        skipped: total - added,
        total,
    };

    (combined, stats)
}

/// Statistics about a transaction merge operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}

impl MergeStats {
    pub fn has_duplicates(&self) -> bool {
        self.skipped > 0
    }
}

/// Duplicate key. Source, category, counterparty, payment method and id are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Signature {
    time: NaiveDateTime,
    amount: Decimal,
    description: String,
    kind: TxnType,
}

fn build_signature(txn: &Transaction) -> Signature {
    Signature {
        time: txn.transaction_time,
        // 12.5 and 12.50 are the same amount
        amount: txn.amount.normalize(),
        description: txn.description.clone(),
        kind: txn.kind,
    }
}

/// Deduplicate transactions in-place. Keeps the first occurrence and removes
/// subsequent ones, preserving order.
///
/// Returns the count of removed transactions.
pub fn dedup_transactions_by_signature(txns: &mut Vec<Transaction>) -> usize {
    let before = txns.len();
    let mut seen: HashSet<Signature> = HashSet::with_capacity(before);
    txns.retain(|t| seen.insert(build_signature(t)));
    before - txns.len()
}

/// Sort transactions in-place, most recent first. Sorting is stable.
pub fn sort_transactions_by_time(txns: &mut [Transaction]) {
    txns.sort_by(|a, b| b.transaction_time.cmp(&a.transaction_time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use models::Source;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn txn(time: NaiveDateTime, amount: Decimal, description: &str, kind: TxnType) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            transaction_time: time,
            category: "餐饮美食".to_string(),
            counterparty: "食堂".to_string(),
            description: description.to_string(),
            kind,
            amount,
            payment_method: "零钱".to_string(),
            source: Source::Wechat,
        }
    }

    #[test]
    fn test_payment_channel_difference_is_still_a_duplicate() {
        let a = txn(at(2, 12), dec!(18.00), "午餐", TxnType::Expense);
        let mut b = txn(at(2, 12), dec!(18.0), "午餐", TxnType::Expense);
        b.payment_method = "花呗".to_string();
        b.source = Source::Alipay;
        b.category = "Other".to_string();

        let first_id = a.id;
        let (merged, stats) = merge_transactions(&[], vec![a, b], MergeMode::Cumulative);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, first_id);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.skipped, 1);
        assert!(stats.has_duplicates());
    }

    #[test]
    fn test_type_is_part_of_the_key() {
        let a = txn(at(2, 12), dec!(18), "转账", TxnType::Expense);
        let b = txn(at(2, 12), dec!(18), "转账", TxnType::Income);
        let (merged, _) = merge_transactions(&[], vec![a, b], MergeMode::Cumulative);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![
            txn(at(1, 9), dec!(5), "咖啡", TxnType::Expense),
            txn(at(3, 9), dec!(7), "面包", TxnType::Expense),
        ];
        let (first, _) = merge_transactions(&[], batch.clone(), MergeMode::Cumulative);
        let (second, stats) = merge_transactions(&first, batch, MergeMode::Cumulative);

        assert_eq!(first, second);
        assert_eq!(stats.added, 0);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_replace_ignores_prior_state() {
        let prior = vec![
            txn(at(1, 9), dec!(5), "咖啡", TxnType::Expense),
            txn(at(1, 10), dec!(6), "咖啡", TxnType::Expense),
        ];
        let batch = vec![
            txn(at(5, 9), dec!(100), "工资", TxnType::Income),
            txn(at(5, 9), dec!(100), "工资", TxnType::Income),
            txn(at(6, 9), dec!(3), "公交", TxnType::Expense),
        ];
        let (merged, stats) = merge_transactions(&prior, batch, MergeMode::Replace);
        assert_eq!(merged.len(), 2);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.added, 2);
    }

    #[test]
    fn test_cumulative_without_overlap_appends_everything() {
        let prior = vec![txn(at(1, 9), dec!(5), "咖啡", TxnType::Expense)];
        let batch = vec![
            txn(at(2, 9), dec!(5), "咖啡", TxnType::Expense),
            txn(at(3, 9), dec!(5), "咖啡", TxnType::Expense),
        ];
        let (merged, stats) = merge_transactions(&prior, batch, MergeMode::Cumulative);
        assert_eq!(merged.len(), 3);
        assert!(!stats.has_duplicates());
    }

    #[test]
    fn test_merged_output_is_most_recent_first() {
        let batch = vec![
            txn(at(2, 9), dec!(1), "b", TxnType::Expense),
            txn(at(9, 9), dec!(1), "c", TxnType::Expense),
            txn(at(1, 9), dec!(1), "a", TxnType::Expense),
        ];
        let (merged, _) = merge_transactions(&[], batch, MergeMode::Replace);
        let descriptions: Vec<&str> = merged.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_times() {
        let mut txns = vec![
            txn(at(2, 9), dec!(1), "first", TxnType::Expense),
            txn(at(2, 9), dec!(2), "second", TxnType::Expense),
        ];
        sort_transactions_by_time(&mut txns);
        assert_eq!(txns[0].description, "first");
    }

    #[test]
    fn test_dedup_reports_removed_count() {
        let mut txns = vec![
            txn(at(2, 9), dec!(1), "x", TxnType::Expense),
            txn(at(2, 9), dec!(1), "x", TxnType::Expense),
            txn(at(2, 9), dec!(1), "x", TxnType::Expense),
        ];
        assert_eq!(dedup_transactions_by_signature(&mut txns), 2);
        assert_eq!(txns.len(), 1);
    }
}
