use std::path::PathBuf;

use clap::Parser;

use inkwell_core::InkwellConfig;
use inkwell_core::config::ConfigSource;

/// Inkwell - a literary clock that turns into a typewriter when you touch it
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "inkwell")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, env = "INKWELL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Quote dataset path (overrides config and INKWELL_DATASET)
    #[arg(short = 'd', long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Seed for quote selection, for reproducible runs
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Log frames instead of drawing them on the terminal
    #[arg(long)]
    pub headless: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print dataset statistics and the quote for the current minute, then exit
    #[arg(long)]
    pub stats: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply(&self, config: &mut InkwellConfig) {
        if let Some(ref path) = self.dataset {
            config.dataset.path = path.clone();
            config.set_source(ConfigSource::Cli);
        }
    }

    /// Logs share the terminal with the display unless they go elsewhere.
    pub fn default_log_level(&self) -> &'static str {
        if self.headless || self.stats || self.log_file.is_some() {
            "info"
        } else {
            "warn"
        }
    }
}
