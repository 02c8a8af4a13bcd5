//! Configuration for volbridge.
//!
//! The daemon reads a JSON file from the user's configuration directory at
//! startup. The file is never written back: volume and link state are not
//! persisted across restarts.

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default name fragment of the virtual capture device.
pub const DEFAULT_CAPTURE_DEVICE: &str = "BlackHole";
/// Default name fragment of the physical playback device.
pub const DEFAULT_PLAYBACK_DEVICE: &str = "U2723QE";
/// Default volume applied when the daemon starts.
pub const DEFAULT_INITIAL_VOLUME: f32 = 0.5;
/// Default number of volume-key presses between silence and full volume.
pub const DEFAULT_VOLUME_STEPS: u32 = 16;
/// Default quiescence window before acting on a default-output change.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Case-insensitive name fragment of the virtual capture device
    #[serde(default = "default_capture_device")]
    pub capture_device: String,
    /// Case-insensitive name fragment of the physical playback device
    #[serde(default = "default_playback_device")]
    pub playback_device: String,
    /// Volume level applied at startup (0.0 - 1.0)
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,
    /// Number of volume-key presses between silence and full volume
    #[serde(default = "default_volume_steps")]
    pub volume_steps: u32,
    /// Delay in milliseconds before re-evaluating a default-output change
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_capture_device() -> String {
    DEFAULT_CAPTURE_DEVICE.to_string()
}

fn default_playback_device() -> String {
    DEFAULT_PLAYBACK_DEVICE.to_string()
}

fn default_initial_volume() -> f32 {
    DEFAULT_INITIAL_VOLUME
}

fn default_volume_steps() -> u32 {
    DEFAULT_VOLUME_STEPS
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_device: default_capture_device(),
            playback_device: default_playback_device(),
            initial_volume: DEFAULT_INITIAL_VOLUME,
            volume_steps: DEFAULT_VOLUME_STEPS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Why a config file could not be used.
#[derive(Debug)]
pub enum ConfigLoadError {
    /// The file exists but could not be read
    Read(io::Error),
    /// The file was read but is not valid configuration JSON
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::Read(e) => write!(f, "failed to read config file: {}", e),
            ConfigLoadError::Parse(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

impl Config {
    /// Get the path to the configuration file.
    ///
    /// Returns platform-specific path:
    /// - Linux: ~/.config/volbridge/config.json
    /// - macOS: ~/Library/Application Support/volbridge/config.json
    /// - Windows: %APPDATA%\volbridge\config.json
    pub fn config_path() -> PathBuf {
        BaseDirs::new()
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("volbridge")
            .join("config.json")
    }

    /// Load configuration from `path`.
    ///
    /// A missing file is not an error and yields `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigLoadError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(ConfigLoadError::Read)?;
        Self::from_json(&contents).map(Some)
    }

    /// Parse configuration JSON, normalizing out-of-range values.
    pub fn from_json(contents: &str) -> Result<Self, ConfigLoadError> {
        let config: Config = serde_json::from_str(contents).map_err(ConfigLoadError::Parse)?;
        Ok(config.normalized())
    }

    /// Clamp values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.initial_volume = if self.initial_volume.is_finite() {
            self.initial_volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_INITIAL_VOLUME
        };
        if self.volume_steps == 0 {
            self.volume_steps = DEFAULT_VOLUME_STEPS;
        }
        self
    }

    /// Quiescence window before acting on a default-output change.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
