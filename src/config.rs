// ═══════════════════════════════════════════════════════════════════════════════
// 📦 config.rs - Application Configuration
// ═══════════════════════════════════════════════════════════════════════════════
// ملف الإعدادات الاختياري rssi_radar.toml
// Optional rssi_radar.toml; every field has a default
//
//   [radar]            slot_count, aggressive_cleaning
//   [radar.channel]    minimum_rssi, variance_threshold, alarm_enabled, ...
//   [serial]           port, baud_rate
//   [logging]          file, level
// ═══════════════════════════════════════════════════════════════════════════════

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RadarError, RadarResult};
use crate::radar::{ChannelConfig, DEFAULT_SLOT_COUNT, MAX_SLOTS};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "rssi_radar.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub radar: RadarConfig,

    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarConfig {
    /// Tracked transmitters, clamped to [1, MAX_SLOTS]
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    /// Evict slots whose RSSI drops below the minimum
    #[serde(default)]
    pub aggressive_cleaning: bool,

    #[serde(default)]
    pub channel: ChannelConfig,
}

/// Serial link to the ESP32 scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name; first USB port when unset
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log file; the TUI owns the terminal
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_slot_count() -> usize {
    DEFAULT_SLOT_COUNT
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_log_file() -> PathBuf {
    PathBuf::from("rssi_radar.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            aggressive_cleaning: false,
            channel: ChannelConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Parse TOML text and normalise the radar settings
    pub fn from_toml(text: &str) -> RadarResult<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.radar = config.radar.normalized()?;
        Ok(config)
    }

    /// Load `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> RadarResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| RadarError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

impl RadarConfig {
    /// Clamp the slot count and validate the channel settings
    pub fn normalized(mut self) -> RadarResult<Self> {
        self.slot_count = self.slot_count.clamp(1, MAX_SLOTS);
        self.channel = self.channel.validated()?;
        Ok(self)
    }
}
