//! Error taxonomy for the control core.
//!
//! Every I/O-adjacent failure is converted into one of these kinds at the
//! boundary. Only a total absence of a usable dataset at startup is fatal.

use std::path::PathBuf;

use thiserror::Error;

use crate::quotes::TimeOfDay;

/// The quote dataset could not be obtained.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// The dataset file exists but could not be read.
    #[error("failed to read quote dataset at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The dataset was read but held no usable record.
    #[error("quote dataset from {origin} contains no usable records")]
    Empty { origin: String },

    /// No dataset could be located or fetched.
    #[error("quote dataset unavailable: {0}")]
    Unavailable(String),
}

/// The key event source is gone or could not be found.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no keyboard device found: {0}")]
    NotFound(String),

    #[error("keyboard device disconnected: {0}")]
    Disconnected(String),

    #[error("keyboard device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A frame could not be pushed to the panel. The frame is dropped.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("display I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("display backend error: {0}")]
    Backend(String),
}

/// Neither the requested minute nor any fallback minute has a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no quote available for {time}")]
pub struct NoQuoteAvailable {
    pub time: TimeOfDay,
}
