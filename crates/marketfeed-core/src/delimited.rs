//! Delimited-text reader for directory and listing feeds.
//!
//! Headers and cells are trimmed. Only [`MISSING_MARKERS`] become missing
//! values; `NA` stays a literal cell because it is a real ticker symbol.

use std::collections::HashMap;

use csv::{ReaderBuilder, Terminator, Trim};
use tracing::debug;

use crate::CoreError;

/// Cell values coerced to "missing".
pub const MISSING_MARKERS: [&str; 4] = ["", "#N/A", "N/A", "NULL"];

/// Parsed table with trimmed headers and missing-aware cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimitedTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl DelimitedTable {
    /// Parses `content` with a header row. Rows whose cells are all missing
    /// are skipped; short rows are padded with missing cells.
    pub fn parse(content: &str, delimiter: u8) -> Result<Self, CoreError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .terminator(Terminator::Any(b'\n'))
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.trim().trim_start_matches('\u{feff}').to_owned())
            .collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut cells: Vec<Option<String>> = record.iter().map(coerce_missing).collect();
            if cells.iter().all(Option::is_none) {
                continue;
            }
            cells.resize(headers.len().max(cells.len()), None);
            rows.push(cells);
        }

        debug!(columns = headers.len(), rows = rows.len(), "parsed delimited table");
        Ok(Self {
            headers,
            index,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = DelimitedRow<'_>> + '_ {
        self.rows.iter().map(move |cells| DelimitedRow { table: self, cells })
    }
}

/// Borrowed view over one table row.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedRow<'a> {
    table: &'a DelimitedTable,
    cells: &'a [Option<String>],
}

impl<'a> DelimitedRow<'a> {
    /// Cell under `column`, or `None` when the column is absent or the cell is missing.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let position = *self.table.index.get(column)?;
        self.cells.get(position)?.as_deref()
    }

    /// First cell of the row, used to spot trailer lines.
    pub fn first(&self) -> Option<&'a str> {
        self.cells.first()?.as_deref()
    }

    pub fn owned(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_owned)
    }
}

fn coerce_missing(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_symbol_is_preserved_and_markers_become_missing() {
        let content = "Symbol|Security Name|ETF\nNA|Nano Labs|N\nXYZ|#N/A|NULL\n";
        let table = DelimitedTable::parse(content, b'|').expect("parse");

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Symbol"), Some("NA"));
        assert_eq!(rows[1].get("Security Name"), None);
        assert_eq!(rows[1].get("ETF"), None);
    }

    #[test]
    fn headers_and_cells_are_trimmed() {
        let content = " symbol , name \n  AAPL ,  Apple Inc. \n";
        let table = DelimitedTable::parse(content, b',').expect("parse");

        assert_eq!(table.headers(), ["symbol", "name"]);
        let row = table.rows().next().expect("one row");
        assert_eq!(row.get("symbol"), Some("AAPL"));
        assert_eq!(row.get("name"), Some("Apple Inc."));
    }

    #[test]
    fn short_rows_and_blank_lines_are_tolerated() {
        let content = "a,b,c\n1,2\n,,\nFile Creation Time: 0101202400:00\n";
        let table = DelimitedTable::parse(content, b',').expect("parse");

        assert_eq!(table.len(), 2);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get("c"), None);
        assert_eq!(rows[1].first(), Some("File Creation Time: 0101202400:00"));
        assert_eq!(rows[0].get("missing-column"), None);
    }
}
