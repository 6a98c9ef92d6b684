//! Renderer-agnostic frames.
//!
//! The core decides which text goes on the panel and in which layout; the
//! renderer owns fonts and pixels.

use std::collections::VecDeque;

use crate::quotes::{QuoteRecord, TimeOfDay, clean_quote_text};
use crate::wrap::wrap_words;

/// Blank lines between stacked quotes on the clock face.
const QUOTE_GAP: usize = 2;

/// Selects the renderer's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Quotes stacked bottom-up, centred, older quotes overflow the top.
    Clock,
    /// Typed text from the top-left.
    Typing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub title: String,
    pub author: String,
}

impl Attribution {
    pub fn from_record(record: &QuoteRecord) -> Self {
        Self {
            title: record.source_title.clone(),
            author: record.source_author.clone(),
        }
    }

    /// "Title, Author", or whichever half is present.
    pub fn caption(&self) -> String {
        match (self.title.is_empty(), self.author.is_empty()) {
            (false, false) => format!("{}, {}", self.title, self.author),
            (false, true) => self.title.clone(),
            (true, false) => self.author.clone(),
            (true, true) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    pub kind: FrameKind,
    pub lines: Vec<String>,
    /// Source of the newest quote on a clock frame.
    pub attribution: Option<Attribution>,
    /// Minute a clock frame was built for.
    pub time: Option<TimeOfDay>,
}

impl DisplayFrame {
    pub fn typing(lines: Vec<String>) -> Self {
        Self {
            kind: FrameKind::Typing,
            lines,
            attribution: None,
            time: None,
        }
    }

    pub fn clock(lines: Vec<String>, attribution: Option<Attribution>, time: TimeOfDay) -> Self {
        Self {
            kind: FrameKind::Clock,
            lines,
            attribution,
            time: Some(time),
        }
    }
}

/// One quote as it will appear on the clock face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockEntry {
    pub text: String,
    pub attribution: Option<Attribution>,
}

impl ClockEntry {
    pub fn from_record(record: &QuoteRecord) -> Self {
        Self {
            text: clean_quote_text(&record.quote_text),
            attribution: Some(Attribution::from_record(record)),
        }
    }

    pub fn placeholder(time: TimeOfDay) -> Self {
        Self {
            text: format!("No quote found for {time}"),
            attribution: None,
        }
    }
}

/// The most recent clock entries, oldest dropped first.
#[derive(Debug, Clone)]
pub struct QuoteHistory {
    entries: VecDeque<ClockEntry>,
    capacity: usize,
}

impl QuoteHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ClockEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&ClockEntry> {
        self.entries.back()
    }

    /// Every entry word-wrapped to `width`, separated by blank lines.
    pub fn to_frame(&self, width: usize, time: TimeOfDay) -> DisplayFrame {
        let mut lines = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                lines.extend(std::iter::repeat_n(String::new(), QUOTE_GAP));
            }
            lines.extend(wrap_words(&entry.text, width));
        }
        let attribution = self.latest().and_then(|e| e.attribution.clone());
        DisplayFrame::clock(lines, attribution, time)
    }
}
