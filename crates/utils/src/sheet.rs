use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use models::{CellValue, RawRow, RawTable, Source};
use std::io::Cursor;

use crate::error::ParseError;

/// Rows of cells indexed by their absolute position in the sheet or text.
pub type Grid = Vec<Vec<CellValue>>;

/// Reads the first worksheet of an xlsx/xls/xlsb/ods buffer.
///
/// calamine trims leading empty rows and columns off a range; they are padded back so
/// that fixed offsets (the WeChat preamble) keep pointing at the right row.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Grid, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::EmptyWorkbook)?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut grid: Grid = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(row.iter().map(cell_value));
        grid.push(cells);
    }

    Ok(grid)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.trim().to_string()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        _ => CellValue::Text(cell.to_string().trim().to_string()),
    }
}

/// Converts an Excel serial date (days since 1899-12-30, fraction = time of day).
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 2958465 is 9999-12-31, the last date Excel can represent
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Concatenated text of a row, used for keyword probing.
pub fn row_text(row: &[CellValue]) -> String {
    row.iter().map(CellValue::as_text).collect::<Vec<_>>().join("")
}

pub fn row_contains_keywords(row: &[CellValue], keywords: &[&str]) -> bool {
    let text = row_text(row);
    keywords.iter().all(|k| text.contains(k))
}

/// First row within `lookahead` rows that mentions every keyword.
pub fn find_header_row(grid: &[Vec<CellValue>], keywords: &[&str], lookahead: usize) -> Option<usize> {
    grid.iter()
        .take(lookahead)
        .position(|row| row_contains_keywords(row, keywords))
}

/// Builds a [`RawTable`] from the header at `header_row` and every non-blank row below.
pub fn table_from_grid(source: Source, grid: Grid, header_row: usize) -> RawTable {
    let Some(header_cells) = grid.get(header_row) else {
        return RawTable::empty(source);
    };

    let labels: Vec<String> = header_cells.iter().map(CellValue::as_text).collect();

    let mut rows = Vec::new();
    for (idx, cells) in grid.into_iter().enumerate().skip(header_row + 1) {
        let mut row = RawRow::new(idx + 1);
        for (label, cell) in labels.iter().zip(cells) {
            if label.is_empty() {
                continue;
            }
            row.insert(label.clone(), cell);
        }
        if row.len() == 0 || row.is_blank() {
            continue;
        }
        rows.push(row);
    }

    RawTable {
        source,
        header_row,
        headers: labels.into_iter().filter(|l| !l.is_empty()).collect(),
        rows,
    }
}
