//! `--stats`: a dataset report with no devices opened.

use std::fmt::Write;

use chrono::NaiveDateTime;
use rand::RngCore;

use inkwell_core::frame::ClockEntry;
use inkwell_core::{FallbackPolicy, QuoteDataset, TimeOfDay};

pub fn stats_report(
    dataset: &QuoteDataset,
    now: NaiveDateTime,
    fallback: FallbackPolicy,
    rng: &mut dyn RngCore,
) -> String {
    let time = TimeOfDay::from_time(&now);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Loaded {} quotes for {} unique times",
        dataset.len(),
        dataset.time_count()
    );
    let _ = writeln!(out, "Quotes at {time}: {}", dataset.query(time).len());

    let entry = match dataset.select_with_fallback(time, fallback, rng) {
        Ok(selection) => {
            if selection.is_fallback(time) {
                let _ = writeln!(out, "Nearest earlier quote: {}", selection.matched);
            }
            ClockEntry::from_record(selection.record)
        }
        Err(_) => ClockEntry::placeholder(time),
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", entry.text);
    if let Some(caption) = entry.attribution.map(|a| a.caption()) {
        let _ = writeln!(out, "  - {caption}");
    }
    out
}
