// ═══════════════════════════════════════════════════════════════════════════════
// 📦 radar/mod.rs - Multistatic Interference Radar Core
// ═══════════════════════════════════════════════════════════════════════════════
// كشف الحركة من تذبذب قوة إشارة الواي فاي (RSSI) لعدة نقاط وصول
// Motion detection from RSSI fluctuations of several access points
//
//   observations ──► SlotRegistry (reconcile / admit) ──► ChannelFilter per slot
//                                                          │
//                          CycleResult ◄── aggregate ◄─────┘
// ═══════════════════════════════════════════════════════════════════════════════

pub mod channel;
pub mod compat;
pub mod orchestrator;
pub mod ranking;
pub mod registry;

use std::fmt;

use crate::error::RadarError;

pub use channel::{ChannelConfig, ChannelFilter};
pub use orchestrator::{
    CycleEvent, CycleObserver, CycleResult, NoopObserver, Radar, SlotReport, TracingObserver,
};
pub use ranking::rank_by_strength;
pub use registry::{EvictionReason, Slot, SlotChange, SlotRegistry, SlotState};

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Build-time Limits / الحدود الثابتة
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw RSSI samples kept per transmitter (S)
pub const SAMPLE_BUFFER_SIZE: usize = 32;

/// Samples averaged for the moving average (K ≤ S)
pub const MOVING_AVERAGE_WINDOW: usize = SAMPLE_BUFFER_SIZE;

/// Variance samples kept per transmitter (V ≤ S)
pub const VARIANCE_BUFFER_SIZE: usize = 16;

/// Variance samples summed by the integrator (M ≤ V)
pub const VARIANCE_INTEGRATOR_LIMIT: usize = 3;

/// Compiled maximum number of tracked transmitters
/// الحد الأقصى لعدد أجهزة الإرسال المتتبعة
pub const MAX_SLOTS: usize = 8;

/// Default number of tracked transmitters
pub const DEFAULT_SLOT_COUNT: usize = 4;

/// Scan results considered per cycle; extra entries are ignored
pub const MAX_SCAN_RESULTS: usize = 64;

/// Lowest RSSI any radio reports, in dBm
pub const ABSOLUTE_RSSI_LIMIT: i32 = -128;

/// Maximum SSID length in bytes (802.11)
pub const MAX_SSID_LEN: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 BSSID / معرّف نقطة الوصول
// ═══════════════════════════════════════════════════════════════════════════════

/// 6-byte hardware address of an access point
/// عنوان العتاد لنقطة الوصول (6 بايت)
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Bssid(pub [u8; 6]);

impl Bssid {
    /// The all-zero address, used for "no transmitter"
    pub const ZERO: Bssid = Bssid([0; 6]);

    /// Parse `aa:bb:cc:dd:ee:ff` (case-insensitive)
    pub fn parse(s: &str) -> Result<Self, RadarError> {
        let invalid = || RadarError::InvalidBssid {
            input: s.to_owned(),
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl fmt::Debug for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bssid({self})")
    }
}

impl fmt::Display for Bssid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Observation / نتيجة المسح
// ═══════════════════════════════════════════════════════════════════════════════

/// One access point seen by one scan
/// نقطة وصول واحدة ظهرت في مسح واحد
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub bssid: Bssid,
    /// Signal strength in dBm
    pub rssi: i32,
    /// 802.11 channel number
    pub channel: u8,
    /// Network name, diagnostics only
    pub ssid: String,
}

impl Observation {
    pub fn new(bssid: Bssid, rssi: i32, channel: u8, ssid: &str) -> Self {
        Self {
            bssid,
            rssi,
            channel,
            ssid: truncate_ssid(ssid),
        }
    }
}

/// Cut an SSID to 32 bytes without splitting a UTF-8 character
pub(crate) fn truncate_ssid(ssid: &str) -> String {
    if ssid.len() <= MAX_SSID_LEN {
        return ssid.to_string();
    }
    let mut end = MAX_SSID_LEN;
    while !ssid.is_char_boundary(end) {
        end -= 1;
    }
    ssid[..end].to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Radar Status / حالة الرادار
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of one channel ingest or one whole cycle
/// نتيجة معالجة عينة واحدة أو دورة كاملة
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarStatus {
    /// Sample history not yet valid
    Booting,
    /// Variance below threshold
    NoDetection,
    /// Variance at or above threshold, in dBm²
    Detection(i64),
    /// Raw variance, alarm disabled
    Level(i64),
    /// No observations this cycle
    Inoperable,
    /// No radar context exists
    Uninitialized,
}

impl RadarStatus {
    /// Detection magnitude, if this status carries one
    pub fn value(&self) -> Option<i64> {
        match self {
            RadarStatus::Detection(v) | RadarStatus::Level(v) => Some(*v),
            RadarStatus::NoDetection => Some(0),
            _ => None,
        }
    }

    pub fn is_detection(&self) -> bool {
        matches!(self, RadarStatus::Detection(_))
    }

    /// Short label for logs and the UI
    pub fn label(&self) -> &'static str {
        match self {
            RadarStatus::Booting => "booting",
            RadarStatus::NoDetection => "none",
            RadarStatus::Detection(_) => "DETECTION",
            RadarStatus::Level(_) => "level",
            RadarStatus::Inoperable => "inoperable",
            RadarStatus::Uninitialized => "uninitialized",
        }
    }
}

impl fmt::Display for RadarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadarStatus::Detection(v) | RadarStatus::Level(v) => {
                write!(f, "{} ({v})", self.label())
            }
            _ => f.write_str(self.label()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════
