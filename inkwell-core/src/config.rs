//! TOML Configuration File Support
//!
//! Loads `$XDG_CONFIG_HOME/inkwell/inkwell.toml` (typically
//! `~/.config/inkwell/inkwell.toml`).
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (applied by the caller)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [display]
//! line_width = 45
//! max_lines_visible = 20
//!
//! [clock]
//! history_len = 15
//! fallback = "previous"
//!
//! [keyboard]
//! escape_command = ";clock"
//! debounce_ms = 50
//! reset_on_type_mode = false
//!
//! [dataset]
//! path = "/home/pi/.local/share/inkwell/litclock_annotated.csv"
//!
//! [retry]
//! initial_delay_ms = 1000
//! max_delay_ms = 60000
//! max_attempts = 20
//! ```

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::EscapeCommand;
use crate::quotes::FallbackPolicy;
use crate::retry::RetryPolicy;

pub const DATASET_FILE_NAME: &str = "litclock_annotated.csv";
pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/JohannesNE/literature-clock/master/litclock_annotated.csv";

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Where the effective configuration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Cli,
    Env,
    File,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Characters per typed line
    pub line_width: Option<usize>,
    /// Committed lines kept before the oldest scrolls away
    pub max_lines_visible: Option<usize>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockToml {
    /// Quotes stacked on the clock face
    pub history_len: Option<usize>,
    pub fallback: Option<FallbackPolicy>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardToml {
    pub escape_command: Option<String>,
    pub debounce_ms: Option<u64>,
    pub reset_on_type_mode: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetToml {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryToml {
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InkwellToml {
    pub display: DisplayToml,
    pub clock: ClockToml,
    pub keyboard: KeyboardToml,
    pub dataset: DatasetToml,
    pub retry: RetryToml,
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Everything the Mode Controller reads. Fixed once the controller is built.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub line_width: usize,
    pub max_lines_visible: usize,
    pub escape_command: EscapeCommand,
    pub history_len: usize,
    pub fallback: FallbackPolicy,
    pub reset_on_type_mode: bool,
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            line_width: 45,
            max_lines_visible: 20,
            escape_command: EscapeCommand::default(),
            history_len: 15,
            fallback: FallbackPolicy::Previous,
            reset_on_type_mode: false,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct KeyboardConfig {
    /// Presses closer together than this are dropped
    pub debounce: Duration,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Fetched into `path` when the file is missing
    pub url: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            url: Some(DEFAULT_DATASET_URL.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InkwellConfig {
    pub controller: ControllerConfig,
    pub keyboard: KeyboardConfig,
    pub dataset: DatasetConfig,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for InkwellConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            keyboard: KeyboardConfig::default(),
            dataset: DatasetConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl InkwellConfig {
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        if c.line_width == 0 {
            return Err(ConfigError::ValidationError("line_width must be > 0".into()));
        }
        if c.max_lines_visible == 0 {
            return Err(ConfigError::ValidationError(
                "max_lines_visible must be > 0".into(),
            ));
        }
        if c.history_len == 0 {
            return Err(ConfigError::ValidationError("history_len must be > 0".into()));
        }
        if c.retry.initial_delay > c.retry.max_delay {
            return Err(ConfigError::ValidationError(
                "retry initial_delay_ms must not exceed max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "inkwell")
}

/// `$XDG_CONFIG_HOME/inkwell/inkwell.toml`
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("inkwell.toml"))
}

/// `$XDG_DATA_HOME/inkwell/litclock_annotated.csv`, or the working directory.
pub fn default_dataset_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATASET_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATASET_FILE_NAME))
}

/// Load from the default path. A missing file is not an error.
pub fn load_config() -> Result<InkwellConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load defaults, then the file at `path` (if it exists), then environment
/// overrides, then validate.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<InkwellConfig, ConfigError> {
    let mut config = InkwellConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: InkwellToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn escape_command(token: &str) -> Result<EscapeCommand, ConfigError> {
    EscapeCommand::new(token).ok_or_else(|| {
        ConfigError::ValidationError(format!(
            "escape_command {token:?} must be non-empty and free of control characters"
        ))
    })
}

fn parse_line_width(raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!(
            "INKWELL_LINE_WIDTH {raw:?} is not a whole number of columns"
        ))
    })
}

pub fn apply_toml_config(config: &mut InkwellConfig, toml: &InkwellToml) -> Result<(), ConfigError> {
    let c = &mut config.controller;

    if let Some(width) = toml.display.line_width {
        c.line_width = width;
    }
    if let Some(lines) = toml.display.max_lines_visible {
        c.max_lines_visible = lines;
    }

    if let Some(len) = toml.clock.history_len {
        c.history_len = len;
    }
    if let Some(policy) = toml.clock.fallback {
        c.fallback = policy;
    }

    if let Some(ref token) = toml.keyboard.escape_command {
        c.escape_command = escape_command(token)?;
    }
    if let Some(reset) = toml.keyboard.reset_on_type_mode {
        c.reset_on_type_mode = reset;
    }
    if let Some(ms) = toml.keyboard.debounce_ms {
        config.keyboard.debounce = Duration::from_millis(ms);
    }

    if let Some(ms) = toml.retry.initial_delay_ms {
        config.controller.retry.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.retry.max_delay_ms {
        config.controller.retry.max_delay = Duration::from_millis(ms);
    }
    if let Some(attempts) = toml.retry.max_attempts {
        config.controller.retry.max_attempts = attempts;
    }

    if let Some(ref path) = toml.dataset.path {
        config.dataset.path = path.clone();
    }
    if let Some(ref url) = toml.dataset.url {
        config.dataset.url = (!url.is_empty()).then(|| url.clone());
    }

    Ok(())
}

fn apply_env_config(config: &mut InkwellConfig) -> Result<(), ConfigError> {
    if let Ok(path) = std::env::var("INKWELL_DATASET") {
        config.dataset.path = PathBuf::from(path);
        config.source = ConfigSource::Env;
    }
    if let Ok(url) = std::env::var("INKWELL_DATASET_URL") {
        config.dataset.url = (!url.is_empty()).then_some(url);
        config.source = ConfigSource::Env;
    }
    if let Ok(token) = std::env::var("INKWELL_ESCAPE") {
        config.controller.escape_command = escape_command(&token)?;
        config.source = ConfigSource::Env;
    }
    if let Ok(width) = std::env::var("INKWELL_LINE_WIDTH") {
        config.controller.line_width = parse_line_width(&width)?;
        config.source = ConfigSource::Env;
    }
    Ok(())
}
