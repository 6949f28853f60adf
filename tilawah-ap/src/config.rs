//! Configuration management for the tilawah-ap player
//!
//! Bootstrap configuration loaded from a TOML file. Every key has a
//! built-in default, so a missing file is not an error.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (applied by the binary)
//! 2. Config file named by `--config` or `TILAWAH_CONFIG`
//! 3. `<config_dir>/tilawah/config.toml` if it exists
//! 4. Built-in defaults (code constants)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tilawah_common::config::{read_config_file, resolve_config_path};
use tilawah_common::policy::{validate_playback_speed, DEFAULT_RECITER};
use tilawah_common::PlaybackPolicy;
use tracing::info;

use crate::error::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "TILAWAH_CONFIG";

/// Public surah API
pub const DEFAULT_API_BASE_URL: &str = "https://quran-api-id-kappa.vercel.app";

/// Request timeout for surah fetches
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Events buffered per subscriber before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Commands buffered before engine handles wait
pub const DEFAULT_COMMAND_CAPACITY: usize = 32;

/// Length of one simulated clip at 1x speed
pub const DEFAULT_CLIP_SECONDS: f64 = 4.0;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Base URL of the surah API (`{base}/surahs/{n}`)
    pub api_base_url: String,

    /// Request timeout in seconds
    pub http_timeout_secs: u64,

    /// Event broadcast capacity
    pub event_capacity: usize,

    pub playback: PlaybackConfig,

    pub simulation: SimulationConfig,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            playback: PlaybackConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Initial playback preferences
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub reciter: String,
    pub continuous_play: bool,
    pub shuffle: bool,
    pub playback_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            reciter: DEFAULT_RECITER.to_string(),
            continuous_play: false,
            shuffle: false,
            playback_speed: 1.0,
        }
    }
}

/// Simulated output device
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds each clip lasts at 1x speed
    pub clip_seconds: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clip_seconds: DEFAULT_CLIP_SECONDS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "tilawah_ap=info,tilawah_common=info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_config_file(path).map_err(|e| Error::Config(e.to_string()))?;
        let config: TomlConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))?;
        config.validate()?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file and load it, or fall back to defaults.
    ///
    /// Returns the path the configuration came from, if any.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(cli_path, CONFIG_ENV_VAR) {
            Some(path) => {
                let config = Self::load(&path)?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::Config("http_timeout_secs must be positive".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".to_string()));
        }
        if self.playback.reciter.trim().is_empty() {
            return Err(Error::Config("playback.reciter must not be empty".to_string()));
        }
        validate_playback_speed(self.playback.playback_speed)
            .map_err(|e| Error::Config(format!("playback.playback_speed: {}", e)))?;
        if !self.simulation.clip_seconds.is_finite() || self.simulation.clip_seconds <= 0.0 {
            return Err(Error::Config(format!(
                "simulation.clip_seconds must be positive, got {}",
                self.simulation.clip_seconds
            )));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Initial playback policy
    pub fn to_policy(&self) -> PlaybackPolicy {
        PlaybackPolicy {
            continuous_play: self.playback.continuous_play,
            shuffle: self.playback.shuffle,
            reciter_id: self.playback.reciter.clone(),
            playback_speed: self.playback.playback_speed,
        }
    }
}
