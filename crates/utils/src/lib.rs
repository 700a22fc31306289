pub mod error;
pub mod normalize;
pub mod parser;
pub mod sheet;
pub mod transactions;

// Re-export commonly used items
pub use crate::error::{ParseError, RowRejection};
pub use crate::normalize::{
    normalize_row, normalize_table, parse_amount, parse_datetime_text, parse_timestamp, plain_text,
    ColumnMap, FieldMap, FlowSentinel, Normalized, RejectionStats, MAX_AMOUNT,
};
pub use crate::parser::StatementParser;
pub use crate::sheet::{find_header_row, read_first_sheet, table_from_grid, Grid};
pub use crate::transactions::{
    dedup_transactions_by_signature, merge_transactions, sort_transactions_by_time, MergeStats,
};
