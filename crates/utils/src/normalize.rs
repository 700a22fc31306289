use chrono::{NaiveDate, NaiveDateTime};
use models::{CellValue, RawRow, RawTable, Source, Transaction, TxnType, DEFAULT_CATEGORY};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{ParseError, RowRejection};
use crate::sheet::excel_serial_to_datetime;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y年%m月%d日 %H:%M:%S",
    "%Y年%m月%d日 %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"];

/// How a dialect marks rows that are neither income nor expense.
#[derive(Debug, Clone, Copy)]
pub enum FlowSentinel {
    Exact(&'static str),
    Contains(&'static str),
}

impl FlowSentinel {
    pub fn matches(&self, flow: &str) -> bool {
        match self {
            FlowSentinel::Exact(s) => flow == *s,
            FlowSentinel::Contains(s) => flow.contains(s),
        }
    }
}

/// Per-dialect mapping from canonical fields to header labels.
///
/// Each field lists accepted labels, preferred label first.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub source: Source,
    pub flow: &'static [&'static str],
    pub time: &'static [&'static str],
    pub amount: &'static [&'static str],
    pub category: &'static [&'static str],
    pub counterparty: &'static [&'static str],
    pub description: &'static [&'static str],
    pub payment_method: &'static [&'static str],
    pub neutral: FlowSentinel,
    pub income_marker: &'static str,
    /// Applied to every free-text field before defaulting.
    pub clean_text: fn(&str) -> String,
}

/// Header labels actually present in one file, resolved from a [`FieldMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub flow: String,
    pub time: String,
    pub amount: String,
    pub category: String,
    pub counterparty: String,
    pub description: String,
    pub payment_method: String,
}

impl FieldMap {
    /// Resolves every field against the located header, failing with the primary
    /// labels of whatever is missing.
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnMap, ParseError> {
        let mut missing = Vec::new();
        let mut pick = |aliases: &'static [&'static str]| -> String {
            match aliases.iter().find(|a| headers.iter().any(|h| h == *a)) {
                Some(label) => label.to_string(),
                None => {
                    missing.push(aliases.first().copied().unwrap_or_default().to_string());
                    String::new()
                }
            }
        };

        let columns = ColumnMap {
            flow: pick(self.flow),
            time: pick(self.time),
            amount: pick(self.amount),
            category: pick(self.category),
            counterparty: pick(self.counterparty),
            description: pick(self.description),
            payment_method: pick(self.payment_method),
        };

        if missing.is_empty() {
            Ok(columns)
        } else {
            Err(ParseError::MissingColumns {
                dialect: self.source,
                columns: missing,
            })
        }
    }
}

/// Counts of rows dropped while normalizing one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionStats {
    pub missing_field: usize,
    pub neutral_flow: usize,
    pub timestamp: usize,
    pub amount: usize,
}

impl RejectionStats {
    fn record(&mut self, rejection: &RowRejection) {
        match rejection {
            RowRejection::MissingField(_) => self.missing_field += 1,
            RowRejection::NeutralFlow(_) => self.neutral_flow += 1,
            RowRejection::Timestamp(_) => self.timestamp += 1,
            RowRejection::Amount(_) => self.amount += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_field + self.neutral_flow + self.timestamp + self.amount
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub transactions: Vec<Transaction>,
    pub rejected: RejectionStats,
}

/// Normalizes every row of a table. Row problems are counted, never returned.
pub fn normalize_table(table: &RawTable, map: &FieldMap) -> Result<Normalized, ParseError> {
    if table.headers.is_empty() {
        return Ok(Normalized::default());
    }
    let columns = map.resolve(&table.headers)?;

    let mut out = Normalized::default();
    for row in &table.rows {
        match normalize_row(row, map, &columns) {
            Ok(txn) => out.transactions.push(txn),
            Err(RowRejection::NeutralFlow(flow)) => {
                trace!(line = row.line, flow = %flow, "skipping neutral transfer");
                out.rejected.neutral_flow += 1;
            }
            Err(rejection) => {
                debug!(line = row.line, source = %map.source, "dropping row: {}", rejection);
                out.rejected.record(&rejection);
            }
        }
    }
    Ok(out)
}

/// Turns one raw row into a canonical transaction, or explains why it was dropped.
pub fn normalize_row(row: &RawRow, map: &FieldMap, columns: &ColumnMap) -> Result<Transaction, RowRejection> {
    let flow = row
        .get(&columns.flow)
        .ok_or(RowRejection::MissingField("flow indicator"))?
        .as_text();
    if map.neutral.matches(&flow) {
        return Err(RowRejection::NeutralFlow(flow));
    }

    let time_cell = row
        .get(&columns.time)
        .ok_or(RowRejection::MissingField("transaction time"))?;
    let transaction_time =
        parse_timestamp(time_cell).ok_or_else(|| RowRejection::Timestamp(time_cell.as_text()))?;

    let amount_raw = row
        .get(&columns.amount)
        .ok_or(RowRejection::MissingField("amount"))?
        .as_text();
    let amount = parse_amount(&amount_raw).ok_or(RowRejection::Amount(amount_raw))?;

    let kind = if flow.contains(map.income_marker) {
        TxnType::Income
    } else {
        TxnType::Expense
    };

    let category = free_text(row, &columns.category, map.clean_text);

    Ok(Transaction {
        id: Uuid::new_v4(),
        transaction_time,
        category: if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category
        },
        counterparty: free_text(row, &columns.counterparty, map.clean_text),
        description: free_text(row, &columns.description, map.clean_text),
        kind,
        amount,
        payment_method: free_text(row, &columns.payment_method, map.clean_text),
        source: map.source,
    })
}

fn free_text(row: &RawRow, label: &str, clean: fn(&str) -> String) -> String {
    let raw = row.get(label).map(CellValue::as_text).unwrap_or_default();
    let cleaned = clean(&raw);
    // Both providers write "/" into cells that have nothing to say
    if cleaned == "/" {
        String::new()
    } else {
        cleaned
    }
}

/// Default text cleaner: surrounding whitespace only.
pub fn plain_text(raw: &str) -> String {
    raw.trim().to_string()
}

/// Largest single amount accepted from an export. Anything above is treated as garbage,
/// which also keeps sums over any realistic number of rows inside `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Keeps digits, `.` and `-`, parses as a decimal and returns the magnitude.
/// Zero, unparseable and over-[`MAX_AMOUNT`] inputs yield `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&cleaned).ok()?;
    let value = value.abs();
    if value.is_zero() || value > MAX_AMOUNT {
        return None;
    }
    Some(value)
}

pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Number(serial) => excel_serial_to_datetime(*serial),
        CellValue::Text(s) => parse_datetime_text(s),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Parses the timestamp spellings found in WeChat and Alipay exports.
pub fn parse_datetime_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
