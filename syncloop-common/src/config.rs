//! Configuration loading and setting resolution
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--round-to`, `--tolerance-ms`, ...)
//! 2. Environment variables (`SYNCLOOP_*`, resolved by clap before reaching here)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file at the default location is not an error: the built-in
//! defaults apply and the caller reports it. A TOML file that exists but
//! fails to parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default start alignment period in seconds
pub const DEFAULT_ROUND_TO_SECS: f64 = 10.0;

/// Default drift tolerance in milliseconds
pub const DEFAULT_DRIFT_TOLERANCE_MS: f64 = 2.0;

/// Default output buffer size in frames
pub const DEFAULT_BUFFER_FRAMES: u32 = 1024;

/// Default clock monitor cadence in milliseconds
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 1000;

/// Configuration file contents
///
/// Every field is optional; anything left out falls through to the
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Start at the next multiple of this many seconds of wall-clock time
    #[serde(default)]
    pub round_to_secs: Option<f64>,

    /// Offset change (ms) that triggers a drift correction
    #[serde(default)]
    pub drift_tolerance_ms: Option<f64>,

    /// Fixed output buffer size in frames
    #[serde(default)]
    pub buffer_frames: Option<u32>,

    /// Clock monitor cadence in milliseconds
    #[serde(default)]
    pub monitor_interval_ms: Option<u64>,

    /// Output device name (default output device when absent)
    #[serde(default)]
    pub device: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load an explicitly requested file, or the platform default file if present.
    ///
    /// Returns the configuration together with the path it was read from
    /// (`None` when built-in defaults are used). Nothing is logged here so
    /// callers can resolve settings before the subscriber exists.
    ///
    /// # Errors
    /// - `Config` when an explicit path cannot be read
    /// - `ConfigParse` when a file exists but is not valid TOML for this schema
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        match default_config_path() {
            Some(path) if path.exists() => Ok((Self::load(&path)?, Some(path))),
            _ => Ok((Self::default(), None)),
        }
    }
}

/// Get default configuration file path for the platform
///
/// `~/.config/syncloop/config.toml` on Linux, the equivalent per-user
/// config directory elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("syncloop").join("config.toml"))
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub round_to_secs: Option<f64>,
    pub drift_tolerance_ms: Option<f64>,
    pub buffer_frames: Option<u32>,
    pub monitor_interval_ms: Option<u64>,
    pub device: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Start alignment period P in seconds
    pub round_to_secs: f64,

    /// Drift tolerance in milliseconds
    pub drift_tolerance_ms: f64,

    /// Fixed output buffer size in frames
    pub buffer_frames: u32,

    /// Clock monitor cadence
    pub monitor_interval: Duration,

    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Log level directive for the tracing subscriber
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            round_to_secs: DEFAULT_ROUND_TO_SECS,
            drift_tolerance_ms: DEFAULT_DRIFT_TOLERANCE_MS,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            monitor_interval: Duration::from_millis(DEFAULT_MONITOR_INTERVAL_MS),
            device: None,
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Merge overrides, file values and defaults, then validate the result.
    pub fn resolve(overrides: SettingsOverrides, file: TomlConfig) -> Result<Self> {
        let defaults = Self::default();

        let settings = Self {
            round_to_secs: overrides
                .round_to_secs
                .or(file.round_to_secs)
                .unwrap_or(defaults.round_to_secs),
            drift_tolerance_ms: overrides
                .drift_tolerance_ms
                .or(file.drift_tolerance_ms)
                .unwrap_or(defaults.drift_tolerance_ms),
            buffer_frames: overrides
                .buffer_frames
                .or(file.buffer_frames)
                .unwrap_or(defaults.buffer_frames),
            monitor_interval: overrides
                .monitor_interval_ms
                .or(file.monitor_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.monitor_interval),
            device: overrides.device.or(file.device),
            log_level: overrides.log_level.unwrap_or(file.logging.level),
        };

        settings.validate()?;
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    /// Reject values the playback core cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.round_to_secs.is_finite() || self.round_to_secs <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "round_to_secs must be a positive number of seconds, got {}",
                self.round_to_secs
            )));
        }
        if !self.drift_tolerance_ms.is_finite() || self.drift_tolerance_ms < 0.0 {
            return Err(Error::InvalidInput(format!(
                "drift_tolerance_ms must be zero or positive, got {}",
                self.drift_tolerance_ms
            )));
        }
        if self.buffer_frames == 0 {
            return Err(Error::InvalidInput(
                "buffer_frames must be greater than zero".to_string(),
            ));
        }
        if self.monitor_interval.is_zero() {
            return Err(Error::InvalidInput(
                "monitor_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Drift tolerance in seconds
    pub fn drift_tolerance_secs(&self) -> f64 {
        self.drift_tolerance_ms / 1000.0
    }
}
