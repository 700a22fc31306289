use encoding_rs::GB18030;
use models::{CellValue, RawTable, Source};
use std::path::Path;
use tracing::debug;
use utils::normalize::{FieldMap, FlowSentinel};
use utils::sheet::{find_header_row, read_first_sheet, table_from_grid, Grid};
use utils::{ParseError, StatementParser};

pub const PARSER_NAME: &str = "alipay";

/// How far down the export the header row may float.
pub const DEFAULT_HEADER_LOOKAHEAD: usize = 30;

pub const HEADER_KEYWORDS: &[&str] = &["交易时间", "交易分类", "商品说明"];

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

pub static ALIPAY_FIELDS: FieldMap = FieldMap {
    source: Source::Alipay,
    flow: &["收/支"],
    time: &["交易时间"],
    amount: &["金额", "金额(元)", "金额（元）"],
    category: &["交易分类"],
    counterparty: &["交易对方"],
    description: &["商品说明"],
    payment_method: &["收/付款方式", "支付方式"],
    neutral: FlowSentinel::Contains("不计收支"),
    income_marker: "收入",
    clean_text: clean_alipay_text,
};

/// Physical encoding of an Alipay export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Spreadsheet,
}

impl ExportFormat {
    /// Extension first; without a usable one the ZIP and OLE signatures decide.
    pub fn detect(bytes: &[u8], file_name: &str) -> Self {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") | Some("txt") => ExportFormat::Csv,
            Some(e) if SPREADSHEET_EXTENSIONS.contains(&e) => ExportFormat::Spreadsheet,
            _ => {
                if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
                    ExportFormat::Spreadsheet
                } else {
                    ExportFormat::Csv
                }
            }
        }
    }
}

/// Parser for the Alipay bill export, both the CSV and the spreadsheet flavour.
#[derive(Debug, Clone)]
pub struct AlipayParser {
    pub header_lookahead: usize,
}

impl Default for AlipayParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AlipayParser {
    pub fn new() -> Self {
        Self {
            header_lookahead: DEFAULT_HEADER_LOOKAHEAD,
        }
    }

    pub fn with_header_lookahead(mut self, rows: usize) -> Self {
        self.header_lookahead = rows;
        self
    }
}

impl StatementParser for AlipayParser {
    fn source(&self) -> Source {
        Source::Alipay
    }

    fn field_map(&self) -> &'static FieldMap {
        &ALIPAY_FIELDS
    }

    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<RawTable, ParseError> {
        let format = ExportFormat::detect(bytes, file_name);
        debug!(file = file_name, ?format, "reading alipay export");

        let grid = match format {
            ExportFormat::Csv => csv_grid(&decode_text_lossy(bytes))?,
            ExportFormat::Spreadsheet => read_first_sheet(bytes)?,
        };

        let header_row = find_header_row(&grid, HEADER_KEYWORDS, self.header_lookahead).ok_or_else(|| {
            ParseError::HeaderNotFound {
                dialect: Source::Alipay,
                keywords: HEADER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
                window: self.header_lookahead,
            }
        })?;

        let table = table_from_grid(Source::Alipay, grid, header_row);
        ALIPAY_FIELDS.resolve(&table.headers)?;

        Ok(table)
    }
}

/// Decode Alipay export bytes into text.
///
/// Alipay CSV exports are commonly GBK/GB18030, but sometimes can be UTF-8.
pub fn decode_text_lossy(bytes: &[u8]) -> String {
    // UTF-8 BOM
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    if let Ok(s) = std::str::from_utf8(bytes) {
        // Heuristic: if we can already see the Chinese header, accept UTF-8.
        if s.contains("交易时间") {
            return s.to_string();
        }
    }

    let (decoded, _, _) = GB18030.decode(bytes);
    decoded.into_owned()
}

/// Reads every line of the export, preamble included, so the header can be searched for.
fn csv_grid(text: &str) -> Result<Grid, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = Grid::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    let field = field.trim();
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(grid)
}

/// Entity-decodes and collapses whitespace; Alipay pads names with `&nbsp;` and tabs.
pub fn clean_alipay_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded
        .replace('\u{00A0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
