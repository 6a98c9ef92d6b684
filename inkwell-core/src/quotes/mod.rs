//! The Quote Dataset.
//!
//! An immutable index of literary quotations keyed by minute of the day.
//! Built once at load time and shared read-only with the controller.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rand::RngCore;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{DataLoadError, NoQuoteAvailable};

pub mod clean;
pub mod parser;
mod time;

pub use clean::clean_quote_text;
pub use time::{InvalidTime, TimeOfDay};

use parser::RowError;

// ════════════════════════════════════════════════════════════════════
// Data types
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub time: TimeOfDay,
    /// The natural-language time expression inside the quote ("quarter past nine").
    pub time_phrase: String,
    pub quote_text: String,
    pub source_title: String,
    pub source_author: String,
}

/// What to do when the current minute has no quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Use the nearest earlier minute that has a quote, wrapping past midnight.
    #[default]
    Previous,
    /// Show the static placeholder.
    Placeholder,
}

/// A quote chosen for display, and the minute it was filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub record: &'a QuoteRecord,
    pub matched: TimeOfDay,
}

impl Selection<'_> {
    pub fn is_fallback(&self, requested: TimeOfDay) -> bool {
        self.matched != requested
    }
}

/// Anything that can produce a materialised dataset.
pub trait QuoteSource {
    fn load(&self) -> Result<QuoteDataset, DataLoadError>;
}

/// A dataset file on local disk.
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub path: PathBuf,
}

impl CsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuoteSource for CsvFile {
    fn load(&self) -> Result<QuoteDataset, DataLoadError> {
        QuoteDataset::load(&self.path)
    }
}

// ════════════════════════════════════════════════════════════════════
// Dataset
// ════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct QuoteDataset {
    records: Vec<QuoteRecord>,
    by_time: BTreeMap<TimeOfDay, Vec<usize>>,
}

impl QuoteDataset {
    /// Load a dataset file. Malformed rows are skipped and logged; a file
    /// with no usable row at all is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading literature clock data");

        let read_err = |source| DataLoadError::Read {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_err)?;
        let dataset = Self::from_reader(BufReader::new(file)).map_err(read_err)?;

        if dataset.is_empty() {
            return Err(DataLoadError::Empty {
                origin: path.display().to_string(),
            });
        }
        Ok(dataset)
    }

    /// Parse `|`-delimited rows from any reader. An empty result is allowed here.
    /// Rows that fail to decode are skipped like any other malformed row;
    /// only real I/O failures are returned.
    pub fn from_reader<R: BufRead>(mut reader: R) -> std::io::Result<Self> {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut raw = Vec::new();
        let mut n = 0usize;

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            n += 1;
            match parser::parse_raw_row(&raw) {
                Ok(record) => records.push(record),
                Err(RowError::Blank) => {}
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!(line = n, ?reason, "Skipping malformed quote row");
                }
            }
        }

        let dataset = Self::from_records(records);
        tracing::info!(
            quotes = dataset.len(),
            times = dataset.time_count(),
            skipped,
            "Loaded {} quotes for {} unique times",
            dataset.len(),
            dataset.time_count()
        );
        Ok(dataset)
    }

    pub fn from_records(records: Vec<QuoteRecord>) -> Self {
        let mut by_time: BTreeMap<TimeOfDay, Vec<usize>> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_time.entry(record.time).or_default().push(idx);
        }
        Self { records, by_time }
    }

    /// Total number of quotes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct minutes that have at least one quote.
    pub fn time_count(&self) -> usize {
        self.by_time.len()
    }

    /// All records filed under exactly this minute, in load order.
    pub fn query(&self, time: TimeOfDay) -> Vec<&QuoteRecord> {
        self.by_time
            .get(&time)
            .map(|indices| indices.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Pick one record for this minute. Multiple candidates are chosen
    /// uniformly with the supplied randomness.
    pub fn select(&self, time: TimeOfDay, rng: &mut dyn RngCore) -> Option<&QuoteRecord> {
        let indices = self.by_time.get(&time)?;
        let idx = match indices.as_slice() {
            [] => return None,
            [only] => *only,
            many => *many.choose(rng)?,
        };
        self.records.get(idx)
    }

    /// The nearest minute strictly before `time` that has a quote, searching
    /// backwards through midnight. `None` only for an empty dataset or when
    /// `time` itself is the only filed minute.
    pub fn nearest_prior(&self, time: TimeOfDay) -> Option<TimeOfDay> {
        self.by_time
            .range(..time)
            .next_back()
            .or_else(|| self.by_time.range(time..).next_back())
            .map(|(t, _)| *t)
            .filter(|t| *t != time)
    }

    /// `select`, then the fallback policy.
    pub fn select_with_fallback(
        &self,
        time: TimeOfDay,
        policy: FallbackPolicy,
        rng: &mut dyn RngCore,
    ) -> Result<Selection<'_>, NoQuoteAvailable> {
        if let Some(record) = self.select(time, rng) {
            return Ok(Selection {
                record,
                matched: time,
            });
        }

        if policy == FallbackPolicy::Previous {
            if let Some(prior) = self.nearest_prior(time) {
                if let Some(record) = self.select(prior, rng) {
                    return Ok(Selection {
                        record,
                        matched: prior,
                    });
                }
            }
        }

        Err(NoQuoteAvailable { time })
    }
}
