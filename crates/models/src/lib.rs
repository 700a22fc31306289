
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Every amount handled by the ledger is in this currency.
pub const CURRENCY: &str = "CNY";
pub const CURRENCY_SYMBOL: &str = "¥";

/// Category assigned when the export leaves the classification column blank.
pub const DEFAULT_CATEGORY: &str = "Other";

// Transaction models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
	Income,
	Expense,
}

impl TxnType {
	pub fn as_str(&self) -> &'static str {
		match self {
			TxnType::Income => "income",
			TxnType::Expense => "expense",
		}
	}
}

impl fmt::Display for TxnType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TxnType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"income" | "收入" => Ok(TxnType::Income),
			"expense" | "支出" => Ok(TxnType::Expense),
			other => Err(format!("unknown transaction type '{}' (expected income or expense)", other)),
		}
	}
}

/// Which export dialect produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
	/// WeChat Pay wallet export (fixed 16 row preamble, spreadsheet only).
	Wechat,
	/// Alipay export (floating header row, CSV or spreadsheet).
	Alipay,
}

impl Source {
	pub fn as_str(&self) -> &'static str {
		match self {
			Source::Wechat => "wechat",
			Source::Alipay => "alipay",
		}
	}

	pub fn institution(&self) -> &'static str {
		match self {
			Source::Wechat => "WeChat Pay",
			Source::Alipay => "Alipay",
		}
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Canonical record every dialect is normalized into. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
	pub id: Uuid,
	pub transaction_time: NaiveDateTime,
	pub category: String,
	pub counterparty: String,
	pub description: String,
	#[serde(rename = "type")]
	pub kind: TxnType,
	/// Always strictly positive; direction lives in `kind`.
	pub amount: Decimal,
	pub payment_method: String,
	pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
	/// Append the new batch to what is already loaded.
	#[default]
	Cumulative,
	/// Drop what is loaded and keep only the new batch.
	Replace,
}

impl FromStr for MergeMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"cumulative" | "append" => Ok(MergeMode::Cumulative),
			"replace" => Ok(MergeMode::Replace),
			other => Err(format!("unknown merge mode '{}' (expected cumulative or replace)", other)),
		}
	}
}

// Raw input rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
	Empty,
	Text(String),
	Number(f64),
	DateTime(NaiveDateTime),
	Bool(bool),
}

impl CellValue {
	pub fn is_empty(&self) -> bool {
		match self {
			CellValue::Empty => true,
			CellValue::Text(s) => s.trim().is_empty(),
			_ => false,
		}
	}

	/// Trimmed textual rendering of the cell, empty for blank cells.
	pub fn as_text(&self) -> String {
		match self {
			CellValue::Empty => String::new(),
			CellValue::Text(s) => s.trim().to_string(),
			CellValue::Number(f) => f.to_string(),
			CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
			CellValue::Bool(b) => b.to_string(),
		}
	}
}

/// One data row of an export, keyed by header label in column order.
///
/// Rows shorter than the header simply lack the trailing labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawRow {
	/// 1-based line (or sheet row) number in the source file.
	pub line: usize,
	cells: Vec<(String, CellValue)>,
}

impl RawRow {
	pub fn new(line: usize) -> Self {
		Self { line, cells: Vec::new() }
	}

	/// Adds a cell. A label that is already present keeps its first value.
	pub fn insert(&mut self, label: impl Into<String>, value: CellValue) {
		let label = label.into();
		if self.cells.iter().any(|(l, _)| *l == label) {
			return;
		}
		self.cells.push((label, value));
	}

	pub fn get(&self, label: &str) -> Option<&CellValue> {
		self.cells.iter().find(|(l, _)| l == label).map(|(_, v)| v)
	}

	pub fn len(&self) -> usize {
		self.cells.len()
	}

	pub fn is_blank(&self) -> bool {
		self.cells.iter().all(|(_, v)| v.is_empty())
	}
}

/// Parser output: the located header plus every data row below it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTable {
	pub source: Source,
	/// 0-based row index of the header inside the sheet or text.
	pub header_row: usize,
	pub headers: Vec<String>,
	pub rows: Vec<RawRow>,
}

impl RawTable {
	pub fn empty(source: Source) -> Self {
		Self {
			source,
			header_row: 0,
			headers: Vec::new(),
			rows: Vec::new(),
		}
	}

	pub fn has_column(&self, label: &str) -> bool {
		self.headers.iter().any(|h| h == label)
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}

// Derived output models
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DateSpan {
	pub start: NaiveDateTime,
	pub end: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataSummary {
	pub total_income: Decimal,
	pub total_expense: Decimal,
	pub net_income: Decimal,
	pub transaction_count: usize,
	pub date_range: DateSpan,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CategoryStats {
	pub category: String,
	pub amount: Decimal,
	pub count: usize,
	/// Share of the type total, 0..=100.
	pub percentage: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeeklyBucket {
	/// ISO week key, e.g. `2025-W07`.
	pub week: String,
	pub iso_year: i32,
	pub week_number: u32,
	/// Monday of the bucket.
	pub week_start: NaiveDate,
	pub income: Decimal,
	pub expense: Decimal,
}

/// Inclusive day window; a missing bound is open on that side.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
	#[serde(default)]
	pub start: Option<NaiveDate>,
	#[serde(default)]
	pub end: Option<NaiveDate>,
}

impl DateRange {
	pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
		Self { start, end }
	}

	pub fn is_unbounded(&self) -> bool {
		self.start.is_none() && self.end.is_none()
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UploadStatus {
	pub in_flight: bool,
	pub progress_percent: f64,
	pub error_message: Option<String>,
	pub succeeded: bool,
}

/// Partial update of [`UploadStatus`]; `None` leaves a field untouched.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct UploadStatusPatch {
	pub in_flight: Option<bool>,
	pub progress_percent: Option<f64>,
	pub error_message: Option<Option<String>>,
	pub succeeded: Option<bool>,
}

impl UploadStatus {
	pub fn apply(&mut self, patch: UploadStatusPatch) {
		if let Some(v) = patch.in_flight {
			self.in_flight = v;
		}
		if let Some(v) = patch.progress_percent {
			self.progress_percent = v;
		}
		if let Some(v) = patch.error_message {
			self.error_message = v;
		}
		if let Some(v) = patch.succeeded {
			self.succeeded = v;
		}
	}
}

/// Frozen view handed to the report exporter. Built from one transaction slice.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportSnapshot {
	pub generated_at: String,
	pub currency: String,
	pub total_income: Decimal,
	pub total_expense: Decimal,
	pub net_income: Decimal,
	pub transaction_count: usize,
	pub date_range_label: String,
	pub transactions: Vec<Transaction>,
}

// Settings models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
	pub max_retries: u32,
	pub backoff_ms: u64,
	pub output_dir: PathBuf,
}

impl Default for ExportSettings {
	fn default() -> Self {
		Self {
			max_retries: 2,
			backoff_ms: 1000,
			output_dir: PathBuf::from("exports"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 3000,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
	pub settings_version: u32,
	pub default_merge_mode: MergeMode,
	/// How many leading rows are searched for a floating header.
	pub header_lookahead_rows: usize,
	/// Non-data rows preceding the WeChat header.
	pub wechat_preamble_rows: usize,
	pub export: ExportSettings,
	pub server: ServerSettings,
	pub log_filter: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			settings_version: 1,
			default_merge_mode: MergeMode::Cumulative,
			header_lookahead_rows: 30,
			wechat_preamble_rows: 16,
			export: ExportSettings::default(),
			server: ServerSettings::default(),
			log_filter: "info".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_txn_type_parsing_accepts_both_languages() {
		assert_eq!("income".parse::<TxnType>().unwrap(), TxnType::Income);
		assert_eq!("Expense".parse::<TxnType>().unwrap(), TxnType::Expense);
		assert_eq!("收入".parse::<TxnType>().unwrap(), TxnType::Income);
		assert!("transfer".parse::<TxnType>().is_err());
	}

	#[test]
	fn test_source_names() {
		assert_eq!(Source::Wechat.to_string(), "wechat");
		assert_eq!(Source::Alipay.institution(), "Alipay");
		assert_eq!(Source::Wechat.institution(), "WeChat Pay");
	}

	#[test]
	fn test_raw_row_keeps_first_duplicate_label() {
		let mut row = RawRow::new(3);
		row.insert("金额", CellValue::Text("1.00".to_string()));
		row.insert("金额", CellValue::Text("2.00".to_string()));
		assert_eq!(row.len(), 1);
		assert_eq!(row.get("金额").unwrap().as_text(), "1.00");
		assert!(row.get("备注").is_none());
	}

	#[test]
	fn test_raw_row_blank_detection() {
		let mut row = RawRow::new(1);
		row.insert("a", CellValue::Empty);
		row.insert("b", CellValue::Text("   ".to_string()));
		assert!(row.is_blank());
		row.insert("c", CellValue::Number(0.0));
		assert!(!row.is_blank());
	}

	#[test]
	fn test_upload_status_patch_only_touches_given_fields() {
		let mut status = UploadStatus {
			in_flight: true,
			progress_percent: 50.0,
			error_message: Some("old".to_string()),
			succeeded: false,
		};
		status.apply(UploadStatusPatch {
			progress_percent: Some(100.0),
			error_message: Some(None),
			..Default::default()
		});
		assert!(status.in_flight);
		assert_eq!(status.progress_percent, 100.0);
		assert_eq!(status.error_message, None);
	}

	#[test]
	fn test_transaction_serializes_type_field() {
		let txn = Transaction {
			id: Uuid::nil(),
			transaction_time: NaiveDate::from_ymd_opt(2025, 3, 30)
				.unwrap()
				.and_hms_opt(1, 7, 53)
				.unwrap(),
			category: "餐饮美食".to_string(),
			counterparty: "便利店".to_string(),
			description: "饮料".to_string(),
			kind: TxnType::Expense,
			amount: dec!(12.50),
			payment_method: "零钱".to_string(),
			source: Source::Wechat,
		};
		let value = serde_json::to_value(&txn).unwrap();
		assert_eq!(value["type"], "expense");
		assert_eq!(value["source"], "wechat");
		assert_eq!(value["transaction_time"], "2025-03-30T01:07:53");
	}

	#[test]
	fn test_settings_defaults_fill_missing_fields() {
		let settings: Settings = serde_json::from_str(r#"{"header_lookahead_rows": 10}"#).unwrap();
		assert_eq!(settings.header_lookahead_rows, 10);
		assert_eq!(settings.wechat_preamble_rows, 16);
		assert_eq!(settings.export.max_retries, 2);
		assert_eq!(settings.default_merge_mode, MergeMode::Cumulative);
	}
}
