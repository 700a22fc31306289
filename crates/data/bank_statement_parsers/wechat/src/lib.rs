use models::{RawTable, Source};
use tracing::debug;
use utils::normalize::{plain_text, FieldMap, FlowSentinel};
use utils::sheet::{read_first_sheet, row_contains_keywords, table_from_grid};
use utils::{ParseError, StatementParser};

pub const PARSER_NAME: &str = "wechat";

/// Rows of account and summary information WeChat writes above the table.
pub const DEFAULT_PREAMBLE_ROWS: usize = 16;

/// The preamble is fixed, so the header only has to confirm it is really a header.
pub const HEADER_KEYWORDS: &[&str] = &["交易时间", "收/支", "金额"];

pub static WECHAT_FIELDS: FieldMap = FieldMap {
    source: Source::Wechat,
    flow: &["收/支"],
    time: &["交易时间"],
    amount: &["金额(元)", "金额（元）"],
    category: &["交易类型"],
    counterparty: &["交易对方"],
    description: &["商品"],
    payment_method: &["支付方式"],
    // Top-ups, withdrawals and transfers between own wallets
    neutral: FlowSentinel::Exact("/"),
    income_marker: "收入",
    clean_text: plain_text,
};

/// Parser for the WeChat Pay bill export (`微信支付账单流水文件*.xlsx`).
#[derive(Debug, Clone)]
pub struct WeChatXlsxParser {
    pub preamble_rows: usize,
}

impl Default for WeChatXlsxParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WeChatXlsxParser {
    pub fn new() -> Self {
        Self {
            preamble_rows: DEFAULT_PREAMBLE_ROWS,
        }
    }

    pub fn with_preamble_rows(mut self, preamble_rows: usize) -> Self {
        self.preamble_rows = preamble_rows;
        self
    }
}

impl StatementParser for WeChatXlsxParser {
    fn source(&self) -> Source {
        Source::Wechat
    }

    fn field_map(&self) -> &'static FieldMap {
        &WECHAT_FIELDS
    }

    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<RawTable, ParseError> {
        let grid = read_first_sheet(bytes)?;

        let Some(header) = grid.get(self.preamble_rows) else {
            debug!(file = file_name, rows = grid.len(), "sheet ends before the header row");
            return Ok(RawTable::empty(Source::Wechat));
        };

        if !row_contains_keywords(header, HEADER_KEYWORDS) {
            return Err(ParseError::HeaderNotFound {
                dialect: Source::Wechat,
                keywords: HEADER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
                window: self.preamble_rows + 1,
            });
        }

        let table = table_from_grid(Source::Wechat, grid, self.preamble_rows);
        WECHAT_FIELDS.resolve(&table.headers)?;

        Ok(table)
    }
}
