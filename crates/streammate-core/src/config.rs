//! Application configuration.
//!
//! Loaded from TOML; every field has a default so an empty or partial file is
//! valid.
//!
//! # Default locations
//!
//! | Purpose | Linux | macOS |
//! |---------|-------|-------|
//! | History | `~/.local/share/streammate/history.json` | `~/Library/Application Support/streammate/history.json` |
//! | Config | `~/.config/streammate/config.toml` | `~/Library/Application Support/streammate/config.toml` |
//! | Downloads | `~/Downloads` | `~/Downloads` |
//!
//! `STREAMMATE_DATA_DIR` and `STREAMMATE_CONFIG_DIR` override the first two.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::impls::tcp_probe::{DEFAULT_PROBE_HOST, DEFAULT_PROBE_PORT};

const APP_DIR: &str = "streammate";

/// Lower bound for `probe.interval_ms`.
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// How many history entries the front end shows by default.
pub const HISTORY_DISPLAY_LIMIT: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backing file of the record store.
    pub history_file: PathBuf,
    /// Where downloads go when no directory is given.
    pub download_dir: PathBuf,
    pub probe: ProbeConfig,
    pub tasks: TaskConfig,
    pub tools: ToolConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_file: data_dir().join("history.json"),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from("./downloads")),
            probe: ProbeConfig::default(),
            tasks: TaskConfig::default(),
            tools: ToolConfig::default(),
        }
    }
}

/// Connectivity probe settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    /// Pause between two probes.
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PROBE_HOST.to_string(),
            port: DEFAULT_PROBE_PORT,
            timeout_ms: 3_000,
            interval_ms: 5_000,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Never shorter than `MIN_PROBE_INTERVAL`, so a zero in the file does
    /// not turn the monitor into a connect loop.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_PROBE_INTERVAL)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Deadline for one download/conversion. None = wait forever.
    pub timeout_ms: Option<u64>,
}

impl TaskConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// External executables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Load `path` if given, otherwise the default config file if it exists,
    /// otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Directory holding persistent data (the history file).
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("STREAMMATE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("STREAMMATE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[must_use]
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}
