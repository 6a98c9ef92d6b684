//! Inkwell Bridge library target.
//!
//! The binary entry point is in `main.rs`; this exposes the CLI, the stats
//! report and the tracing setup so `tests/*.rs` can reach them.

pub mod cli;
pub mod stats;
pub mod util;

pub use cli::Cli;
