use models::Source;
use thiserror::Error;

/// File-level failure while turning export bytes into a [`models::RawTable`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no {dialect} header row found in the first {window} rows (expected {keywords:?})")]
    HeaderNotFound {
        dialect: Source,
        keywords: Vec<String>,
        window: usize,
    },

    #[error("{dialect} export is missing required columns: {}", .columns.join(", "))]
    MissingColumns { dialect: Source, columns: Vec<String> },

    #[error("cannot read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single row was dropped during normalization. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("row is missing the {0} cell")]
    MissingField(&'static str),

    #[error("neutral flow '{0}' (internal transfer)")]
    NeutralFlow(String),

    #[error("unparseable timestamp '{0}'")]
    Timestamp(String),

    #[error("zero or unparseable amount '{0}'")]
    Amount(String),
}
