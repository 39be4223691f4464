//! CSV preview
//!
//! Reads the header and first rows of a CSV so the file details can show what
//! is about to be uploaded, and counts every data row. Malformed rows are
//! skipped and not counted.

use anyhow::{Context, Result};
use std::io::Cursor;

/// Represents a row of data
pub type Row = Vec<String>;

/// Header and leading rows of a CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPreview {
    pub delimiter: u8,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Data rows in the whole input, header excluded
    pub total_rows: usize,
    /// More rows follow the ones shown
    pub has_more: bool,
}

impl CsvPreview {
    /// Preview with the delimiter detected from the first line
    pub fn from_bytes(data: &[u8], limit: usize) -> Result<Self> {
        Self::with_delimiter(data, detect_delimiter(data), limit)
    }

    pub fn with_delimiter(data: &[u8], delimiter: u8, limit: usize) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true) // Handle rows with varying number of fields
            .from_reader(Cursor::new(data));

        let columns: Vec<String> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if name.is_empty() {
                    format!("Column {}", i + 1)
                } else {
                    name.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        let mut total_rows = 0;

        for (line, result) in reader.records().enumerate() {
            match result {
                Ok(record) => {
                    total_rows += 1;
                    if rows.len() < limit {
                        let row: Row = record.iter().map(str::to_string).collect();
                        rows.push(normalize_row(row, columns.len()));
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed CSV row {}: {}", line + 1, e);
                }
            }
        }

        Ok(Self {
            delimiter,
            columns,
            has_more: total_rows > rows.len(),
            rows,
            total_rows,
        })
    }

    /// One-line size summary, e.g. `3 rows, 8 columns`
    pub fn summary(&self) -> String {
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{} {}", n, word)
            } else {
                format!("{} {}s", n, word)
            }
        };
        format!(
            "{}, {}",
            plural(self.total_rows, "row"),
            plural(self.columns.len(), "column")
        )
    }

    /// Plain-text table: header line, then one line per row
    pub fn render_lines(&self) -> Vec<String> {
        let separator = if self.delimiter == b'\t' {
            "\t".to_string()
        } else {
            format!("{} ", self.delimiter as char)
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.columns.join(&separator));
        lines.extend(self.rows.iter().map(|row| row.join(&separator)));
        if self.has_more {
            lines.push("...".to_string());
        }
        lines
    }
}

/// Detect the delimiter from the first line of the data
pub fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line_end = data.iter().position(|&b| b == b'\n').unwrap_or(data.len());
    let first_line = &data[..first_line_end];

    let count = |delim: u8| first_line.iter().filter(|&&b| b == delim).count();
    let comma_count = count(b',');
    let tab_count = count(b'\t');
    let semicolon_count = count(b';');
    let pipe_count = count(b'|');

    let max = comma_count.max(tab_count).max(semicolon_count).max(pipe_count);

    if max == 0 || max == comma_count {
        b','
    } else if max == tab_count {
        b'\t'
    } else if max == semicolon_count {
        b';'
    } else {
        b'|'
    }
}

/// Pad or truncate a row to the header width
fn normalize_row(mut row: Row, expected_len: usize) -> Row {
    row.resize(expected_len, String::new());
    row
}
