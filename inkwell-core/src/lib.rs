//! # Inkwell Core
//!
//! The control core of the inkwell typewriter: a literary clock and a
//! typewriter sharing one keyboard and one e-ink panel.
//!
//! The hardware sits behind [`device::KeySource`] and
//! [`device::DisplayRenderer`]; backends live in `inkwell-io`.

pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod frame;
pub mod line_buffer;
pub mod quotes;
pub mod retry;
pub mod wrap;

// Re-export the main struct so users can just use `inkwell_core::ModeController`
pub use controller::{KeyOutcome, Mode, ModeController};

pub use command::EscapeCommand;
pub use config::{ControllerConfig, InkwellConfig};
pub use device::{Clock, ControlKey, DisplayRenderer, KeyEvent, KeySource, SystemClock};
pub use error::{DataLoadError, DeviceError, NoQuoteAvailable, RenderError};
pub use frame::{Attribution, DisplayFrame, FrameKind};
pub use line_buffer::LineBuffer;
pub use quotes::{FallbackPolicy, QuoteDataset, QuoteRecord, TimeOfDay};
