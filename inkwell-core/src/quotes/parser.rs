//! Row parser for the literature clock dataset.
//!
//! One record per line, `|`-delimited, no quoting:
//! `HH:MM|time phrase|quote|title|author[|extra...]`

use super::{QuoteRecord, TimeOfDay};

const DELIMITER: char = '|';
const MIN_FIELDS: usize = 4;

/// Why a row was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// Empty or whitespace-only line. Not worth a log line.
    Blank,
    TooFewFields(usize),
    BadTime(String),
    /// Row bytes are not valid UTF-8.
    Encoding,
}

/// Decode one raw row and parse it.
pub fn parse_raw_row(raw: &[u8]) -> Result<QuoteRecord, RowError> {
    let line = std::str::from_utf8(raw).map_err(|_| RowError::Encoding)?;
    parse_row(line)
}

pub fn parse_row(line: &str) -> Result<QuoteRecord, RowError> {
    let line = line.trim_start_matches('\u{feff}').trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(RowError::Blank);
    }

    let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return Err(RowError::TooFewFields(fields.len()));
    }

    let time: TimeOfDay = fields[0]
        .parse()
        .map_err(|_| RowError::BadTime(fields[0].to_string()))?;

    Ok(QuoteRecord {
        time,
        time_phrase: fields[1].to_string(),
        quote_text: fields[2].to_string(),
        source_title: fields[3].to_string(),
        source_author: fields.get(4).map(|s| s.to_string()).unwrap_or_default(),
    })
}
