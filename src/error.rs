// ═══════════════════════════════════════════════════════════════════════════════
// 📦 error.rs - Library Error Types
// ═══════════════════════════════════════════════════════════════════════════════
// Errors raised at the configuration boundary and while setting up logging.
// The detection cycle itself never fails: transient data problems are reported
// as RadarStatus values instead.
// ═══════════════════════════════════════════════════════════════════════════════

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the radar library
/// الأخطاء الصادرة عن مكتبة الرادار
#[derive(Debug, Error)]
pub enum RadarError {
    /// Second-order attenuation must be at least 2
    #[error("second-order attenuation coefficient must be >= 2, got {value}")]
    InvalidAttenuation { value: u32 },

    /// BSSID string could not be parsed
    #[error("failed to parse BSSID from '{input}': expected aa:bb:cc:dd:ee:ff")]
    InvalidBssid { input: String },

    /// Configuration file exists but could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Log file could not be opened or the subscriber was already set
    #[error("failed to initialise logging: {0}")]
    LoggingInit(String),
}

/// Result alias used across the library
pub type RadarResult<T> = Result<T, RadarError>;
