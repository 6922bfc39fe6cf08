// ═══════════════════════════════════════════════════════════════════════════════
// 📦 lib.rs - RSSI Radar Library
// ═══════════════════════════════════════════════════════════════════════════════
// Multistatic Wi-Fi interference radar: detects motion from RSSI variance of
// several access points. The `radar` core performs no I/O.
// ═══════════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod logging;
pub mod radar;

pub use config::Config;
pub use error::{RadarError, RadarResult};
pub use radar::{
    Bssid, ChannelConfig, ChannelFilter, CycleResult, Observation, Radar, RadarStatus,
};
