use models::{RawTable, Source, Transaction};
use tracing::info;

use crate::error::ParseError;
use crate::normalize::{normalize_table, FieldMap};

/// A provider export format. Implementations locate the header and lift every
/// row below it into a [`RawTable`]; normalization is shared.
pub trait StatementParser: Send + Sync {
    fn source(&self) -> Source;

    fn field_map(&self) -> &'static FieldMap;

    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<RawTable, ParseError>;

    /// Parses and normalizes one file.
    fn parse_transactions(&self, bytes: &[u8], file_name: &str) -> Result<Vec<Transaction>, ParseError> {
        let table = self.parse(bytes, file_name)?;
        let normalized = normalize_table(&table, self.field_map())?;

        info!(
            file = file_name,
            source = %self.source(),
            rows = table.rows.len(),
            kept = normalized.transactions.len(),
            dropped = normalized.rejected.total(),
            "parsed statement"
        );

        Ok(normalized.transactions)
    }
}
