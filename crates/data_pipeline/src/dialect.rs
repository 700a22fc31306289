use alipay::AlipayParser;
use models::{Settings, Source, Transaction};
use tracing::{info, warn};
use utils::{ParseError, StatementParser, normalize_table};
use wechat::WeChatXlsxParser;

/// Filename hint, matched case-insensitively as a substring.
pub fn dialect_from_file_name(file_name: &str) -> Option<Source> {
    let lower = file_name.to_lowercase();
    if lower.contains("微信") || lower.contains("wechat") {
        Some(Source::Wechat)
    } else if lower.contains("支付宝") || lower.contains("alipay") {
        Some(Source::Alipay)
    } else {
        None
    }
}

/// One configured parser per dialect.
#[derive(Debug, Clone, Default)]
pub struct Parsers {
    pub wechat: WeChatXlsxParser,
    pub alipay: AlipayParser,
}

impl Parsers {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            wechat: WeChatXlsxParser::new().with_preamble_rows(settings.wechat_preamble_rows),
            alipay: AlipayParser::new().with_header_lookahead(settings.header_lookahead_rows),
        }
    }

    pub fn for_source(&self, source: Source) -> &dyn StatementParser {
        match source {
            Source::Wechat => &self.wechat,
            Source::Alipay => &self.alipay,
        }
    }

    /// Parses one file with the dialect its name suggests.
    ///
    /// A file without a hint is read as Alipay. If no Alipay header shows up the WeChat
    /// layout is tried, and the Alipay error stands unless WeChat finds its header.
    pub fn parse_file(&self, bytes: &[u8], file_name: &str) -> Result<Vec<Transaction>, ParseError> {
        if let Some(source) = dialect_from_file_name(file_name) {
            return self.for_source(source).parse_transactions(bytes, file_name);
        }

        let err = match self.alipay.parse_transactions(bytes, file_name) {
            Ok(txns) => return Ok(txns),
            Err(err @ ParseError::HeaderNotFound { .. }) => err,
            Err(err) => return Err(err),
        };

        match self.wechat.parse(bytes, file_name) {
            Ok(table) if !table.headers.is_empty() => {
                warn!(file = file_name, "no dialect hint and no Alipay header; read as WeChat");
                let normalized = normalize_table(&table, self.wechat.field_map())?;
                info!(
                    file = file_name,
                    kept = normalized.transactions.len(),
                    dropped = normalized.rejected.total(),
                    "parsed statement"
                );
                Ok(normalized.transactions)
            }
            _ => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::wechat_xlsx;

    #[test]
    fn test_dialect_from_file_name() {
        assert_eq!(dialect_from_file_name("微信支付账单(20250101-20250331).xlsx"), Some(Source::Wechat));
        assert_eq!(dialect_from_file_name("WeChat_2025.xlsx"), Some(Source::Wechat));
        assert_eq!(dialect_from_file_name("支付宝交易明细.csv"), Some(Source::Alipay));
        assert_eq!(dialect_from_file_name("ALIPAY.csv"), Some(Source::Alipay));
        assert_eq!(dialect_from_file_name("statement.csv"), None);
    }

    #[test]
    fn test_unhinted_wechat_file_is_probed() {
        let txns = Parsers::default().parse_file(&wechat_xlsx(), "export.xlsx").unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].source, Source::Wechat);
    }

    #[test]
    fn test_unhinted_csv_defaults_to_alipay() {
        let text = "交易时间,交易分类,交易对方,商品说明,收/支,金额,收/付款方式\n\
                    2025-01-01 10:00:00,日用百货,超市,纸巾,支出,9.90,余额\n";
        let txns = Parsers::default().parse_file(text.as_bytes(), "export.csv").unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].source, Source::Alipay);
    }

    #[test]
    fn test_unrecognized_content_keeps_alipay_error() {
        let err = Parsers::default()
            .parse_file("just,some,text\n".as_bytes(), "export.csv")
            .unwrap_err();
        assert!(matches!(err, ParseError::HeaderNotFound { dialect: Source::Alipay, .. }));
    }

    #[test]
    fn test_hint_wins_over_content() {
        let err = Parsers::default()
            .parse_file(&wechat_xlsx(), "alipay.xlsx")
            .unwrap_err();
        assert!(matches!(err, ParseError::HeaderNotFound { dialect: Source::Alipay, .. }));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            wechat_preamble_rows: 3,
            header_lookahead_rows: 5,
            ..Settings::default()
        };
        let parsers = Parsers::from_settings(&settings);
        assert_eq!(parsers.wechat.preamble_rows, 3);
        assert_eq!(parsers.alipay.header_lookahead, 5);
    }
}
