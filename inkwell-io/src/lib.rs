//! # Inkwell IO
//!
//! Concrete devices for the control core: the terminal keyboard, the
//! terminal and log displays, and the dataset download.

pub mod display;
pub mod fetch;
pub mod keyboard;

pub use display::{LogDisplay, TerminalDisplay, layout_frame};
pub use fetch::{download_dataset, ensure_dataset};
pub use keyboard::{TerminalKeySource, map_key};
