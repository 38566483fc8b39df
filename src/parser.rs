//! CSV text to nested records.
//!
//! The first non-blank line holds the headers. Each header is a dotted path
//! into the nested record (`name.full`, `address.city`), and every data line
//! must have exactly as many comma-separated fields as the header. Quotes carry
//! no special meaning: a comma always separates fields.

use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;

use crate::{
    error::ParseError,
    value::{Record, Value},
};

/// Share of rows that must hold a number before a column counts as numeric.
/// The comparison is strict: exactly 80% does not qualify.
const NUMERIC_SHARE_NUMERATOR: usize = 4;
const NUMERIC_SHARE_DENOMINATOR: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// Headers whose values were numeric in more than 80% of the rows, in
    /// header order.
    pub numeric_columns: Vec<String>,
}

impl ParsedCsv {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }
}

pub fn parse(text: &str) -> Result<ParsedCsv, ParseError> {
    let normalized = text.replace("\r\n", "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    // Lines dropped by the trim still count toward reported line numbers.
    let skipped_lines = normalized[..normalized.len() - normalized.trim_start().len()]
        .matches('\n')
        .count() as u64;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(trimmed.as_bytes());
    let mut rows = reader.records();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .map_err(|err| ParseError::Tokenize(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect(),
        None => return Err(ParseError::Empty),
    };

    let mut records = Vec::new();
    let mut numeric_counts = vec![0usize; headers.len()];
    for row in rows {
        let row = row.map_err(|err| ParseError::Tokenize(err.to_string()))?;
        if is_blank(&row) {
            continue;
        }
        let line = row.position().map_or(0, |pos| pos.line()) + skipped_lines;
        if row.len() != headers.len() {
            return Err(ParseError::ArityMismatch {
                line,
                found: row.len(),
                expected: headers.len(),
            });
        }

        let mut record = Record::new();
        for (idx, (header, cell)) in headers.iter().zip(row.iter()).enumerate() {
            let value = Value::from_cell(cell);
            if value.is_number() {
                numeric_counts[idx] += 1;
            }
            record.insert_path(header, value);
        }
        debug!("Parsed line {line} into {} top-level field(s)", record.len());
        records.push(record);
    }

    if records.is_empty() {
        return Err(ParseError::MissingDataRow);
    }

    let numeric_columns = qualify_numeric_columns(&headers, &numeric_counts, records.len());
    Ok(ParsedCsv {
        headers,
        records,
        numeric_columns,
    })
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(str::is_empty) && row.len() <= 1
}

/// Whether writing both paths into one record makes one replace the other.
fn paths_collide(left: &str, right: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with('.'))
    };
    left == right || nested(left, right) || nested(right, left)
}

/// Only a column whose value survives in the record can qualify; a later
/// column writing the same or an overlapping path shadows it.
fn qualify_numeric_columns(headers: &[String], counts: &[usize], total: usize) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for (idx, (header, count)) in headers.iter().zip(counts).enumerate() {
        let shadowed = headers[idx + 1..]
            .iter()
            .any(|later| paths_collide(header, later));
        if shadowed {
            continue;
        }
        if count * NUMERIC_SHARE_DENOMINATOR > total * NUMERIC_SHARE_NUMERATOR {
            columns.push(header.clone());
        }
    }
    columns
}
