// ═══════════════════════════════════════════════════════════════════════════════
// 📦 logging.rs - Tracing Setup
// ═══════════════════════════════════════════════════════════════════════════════
// السجلات تُكتب إلى ملف لأن واجهة الطرفية تستخدم الشاشة
// Logs go to a file; the TUI owns the terminal
// ═══════════════════════════════════════════════════════════════════════════════

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{RadarError, RadarResult};

/// Filter from RUST_LOG, else the configured level
pub fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, appending to the configured log file
pub fn init(config: &LoggingConfig) -> RadarResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .map_err(|e| {
            RadarError::LoggingInit(format!("cannot open {}: {e}", config.file.display()))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| RadarError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_level_falls_back() {
        // must not panic on a malformed directive
        let _ = build_filter("not a [valid filter");
        let _ = build_filter("debug");
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            file: dir.path().join("missing").join("radar.log"),
            level: "info".into(),
        };
        assert!(matches!(init(&config), Err(RadarError::LoggingInit(_))));
    }
}
