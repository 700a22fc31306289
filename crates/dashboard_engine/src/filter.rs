use models::{DateRange, Transaction};
use tracing::debug;

/// Transactions whose calendar day lies in the inclusive range. An absent bound is open.
pub fn filter_by_date_range(txns: &[Transaction], range: &DateRange) -> Vec<Transaction> {
    if range.is_unbounded() {
        return txns.to_vec();
    }

    let kept: Vec<Transaction> = txns
        .iter()
        .filter(|t| {
            let day = t.transaction_time.date();
            range.start.map_or(true, |s| day >= s) && range.end.map_or(true, |e| day <= e)
        })
        .cloned()
        .collect();
    debug!(start = ?range.start, end = ?range.end, kept = kept.len(), of = txns.len(), "applied date range");
    kept
}
