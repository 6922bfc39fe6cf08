// ═══════════════════════════════════════════════════════════════════════════════
// 📦 radar/compat.rs - Sign-Coded Status Boundary
// ═══════════════════════════════════════════════════════════════════════════════
// تحويل الحالة إلى أعداد صحيحة للأنظمة التي تتوقع رموزًا سالبة للأخطاء
// Integer status codes for callers that expect negative error values
//
//   > 0  detection magnitude     0  no detection
//   -4   booting (-1..-4)       -5  uninitialized     -6  inoperable
// ═══════════════════════════════════════════════════════════════════════════════

use super::{Observation, Radar, RadarStatus};

pub const CODE_BOOTING: i64 = -4;
pub const CODE_UNINITIALIZED: i64 = -5;
pub const CODE_INOPERABLE: i64 = -6;

impl RadarStatus {
    /// Sign-coded integer form
    pub fn code(&self) -> i64 {
        match self {
            RadarStatus::Booting => CODE_BOOTING,
            RadarStatus::Uninitialized => CODE_UNINITIALIZED,
            RadarStatus::Inoperable => CODE_INOPERABLE,
            RadarStatus::NoDetection => 0,
            RadarStatus::Detection(v) | RadarStatus::Level(v) => *v,
        }
    }

    /// Decode a sign-coded integer.
    ///
    /// Positive values decode as `Detection`; unknown negative codes as
    /// `Inoperable`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => RadarStatus::NoDetection,
            v if v > 0 => RadarStatus::Detection(v),
            -4..=-1 => RadarStatus::Booting,
            CODE_UNINITIALIZED => RadarStatus::Uninitialized,
            _ => RadarStatus::Inoperable,
        }
    }
}

/// Run one cycle and return its status code; -5 without a radar
pub fn run_cycle_code(radar: Option<&mut Radar>, observations: &[Observation]) -> i64 {
    match radar {
        Some(radar) => radar.run_cycle(observations).status.code(),
        None => RadarStatus::Uninitialized.code(),
    }
}
