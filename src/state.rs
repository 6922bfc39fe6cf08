// ═══════════════════════════════════════════════════════════════════════════════
// 📦 state.rs - Application State Management
// ═══════════════════════════════════════════════════════════════════════════════
// This module defines scan cycles and the application state around the radar.
// Uses Arc<Mutex> for thread-safe sharing between serial reader and TUI threads.
// A whole radar cycle always runs under one lock.
// ═══════════════════════════════════════════════════════════════════════════════

use std::sync::{Arc, Mutex};

use rssi_radar::radar::{CycleResult, Observation, Radar, MAX_SLOTS};

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Scan Cycle Structure / هيكل دورة المسح
// ═══════════════════════════════════════════════════════════════════════════════

/// One Wi-Fi scan report: every access point seen at one moment
/// تقرير مسح واي فاي واحد: جميع نقاط الوصول في لحظة واحدة
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCycle {
    /// Unix timestamp in milliseconds / الطابع الزمني بالميلي ثانية
    pub timestamp: i64,

    /// Access points in scan order / نقاط الوصول بترتيب المسح
    pub observations: Vec<Observation>,
}

impl ScanCycle {
    pub fn new(timestamp: i64, observations: Vec<Observation>) -> Self {
        Self {
            timestamp,
            observations,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Application State / حالة التطبيق
// ═══════════════════════════════════════════════════════════════════════════════

/// Points kept per chart line / عدد النقاط في كل خط من الرسم البياني
pub const MAX_HISTORY: usize = 100;

/// Main application state shared between threads
/// حالة التطبيق الرئيسية المشتركة بين الخيوط
pub struct AppState {
    /// Is the serial receiver currently active? / هل المستقبل التسلسلي نشط حالياً؟
    pub receiver_active: bool,

    /// Radar context / سياق الرادار
    pub radar: Radar,

    /// Result of the most recent cycle / نتيجة آخر دورة
    pub last_result: Option<CycleResult>,

    /// Variance history per slot for charts / تاريخ التباين لكل خانة
    pub slot_history: Vec<Vec<i64>>,

    /// Cumulative variance history / تاريخ التباين الكلي
    pub total_history: Vec<i64>,

    /// Cycles that ended in a detection / عدد الدورات التي انتهت بكشف
    pub detection_count: u64,

    /// Status message to display / رسالة الحالة للعرض
    pub status_message: String,

    /// Serial port name / اسم المنفذ التسلسلي
    pub port_name: String,

    /// Serial baud rate / معدل البود
    pub baud_rate: u32,

    /// Should the application quit? / هل يجب إنهاء التطبيق؟
    pub should_quit: bool,

    // ═══════════════════════════════════════════════════════════════════════
    // 🎬 Playback Mode Fields / حقول وضع التشغيل
    // ═══════════════════════════════════════════════════════════════════════
    /// All loaded scans from CSV (for playback) / جميع عمليات المسح المحملة من CSV
    pub loaded_cycles: Vec<ScanCycle>,

    /// Is playback mode active? / هل وضع التشغيل نشط؟
    pub playback_mode: bool,

    /// Is playback currently playing? / هل التشغيل جارٍ حالياً؟
    pub playback_playing: bool,

    /// Current playback position (scan index) / موقع التشغيل الحالي
    pub playback_position: usize,

    /// Total duration of loaded data in seconds / المدة الإجمالية بالثواني
    pub playback_duration_secs: f64,
}

impl AppState {
    /// Create a new AppState around a configured radar
    /// إنشاء حالة تطبيق جديدة حول رادار مهيأ
    pub fn new(radar: Radar) -> Self {
        Self {
            receiver_active: false,
            radar,
            last_result: None,
            slot_history: vec![Vec::new(); MAX_SLOTS],
            total_history: Vec::new(),
            detection_count: 0,
            status_message: "Press S to start serial, L to load a scan log".to_string(),
            port_name: String::new(),
            baud_rate: 115_200,
            should_quit: false,
            loaded_cycles: Vec::new(),
            playback_mode: false,
            playback_playing: false,
            playback_position: 0,
            playback_duration_secs: 0.0,
        }
    }

    /// Run one radar cycle on a scan and update the chart history
    /// تشغيل دورة رادار واحدة على المسح وتحديث التاريخ
    pub fn process_scan(&mut self, scan: &ScanCycle) -> CycleResult {
        let result = self.radar.run_cycle(&scan.observations);

        if result.status.is_detection() {
            self.detection_count += 1;
        }

        for (index, history) in self.slot_history.iter_mut().enumerate() {
            let value = result
                .slots
                .get(index)
                .and_then(|slot| slot.variance())
                .unwrap_or(0);
            push_bounded(history, value);
        }
        push_bounded(&mut self.total_history, result.total_variance);

        self.last_result = Some(result.clone());
        result
    }

    /// Forget every transmitter and all chart history
    /// نسيان جميع أجهزة الإرسال وتاريخ الرسوم
    pub fn reset_radar(&mut self) {
        self.radar.reset();
        self.clear_history();
    }

    /// Clear chart history and the last result
    /// مسح تاريخ الرسوم وآخر نتيجة
    pub fn clear_history(&mut self) {
        for history in &mut self.slot_history {
            history.clear();
        }
        self.total_history.clear();
        self.last_result = None;
        self.detection_count = 0;
    }

    /// Cycles run by the radar since the last reset
    pub fn cycle_count(&self) -> u64 {
        self.radar.cycle_count()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // 🎬 Playback Control Methods / دوال التحكم بالتشغيل
    // ═══════════════════════════════════════════════════════════════════════

    /// Start playback mode with loaded scans
    /// بدء وضع التشغيل مع عمليات المسح المحملة
    pub fn start_playback(&mut self) {
        if self.loaded_cycles.is_empty() {
            return;
        }

        self.playback_mode = true;
        self.playback_playing = true;
        self.playback_position = 0;

        if let (Some(first), Some(last)) = (self.loaded_cycles.first(), self.loaded_cycles.last()) {
            self.playback_duration_secs = (last.timestamp - first.timestamp) as f64 / 1000.0;
        }

        // replayed data starts from an empty radar
        self.reset_radar();
    }

    /// Toggle playback play/pause
    /// تبديل التشغيل/الإيقاف المؤقت
    pub fn toggle_playback(&mut self) {
        if self.playback_mode {
            self.playback_playing = !self.playback_playing;
        }
    }

    /// Stop playback and return to live mode
    /// إيقاف التشغيل والعودة للبث المباشر
    pub fn stop_playback(&mut self) {
        self.playback_mode = false;
        self.playback_playing = false;
        self.playback_position = 0;
    }

    /// Seek to a specific second in playback.
    ///
    /// The radar is reset: filter history from before the jump would
    /// otherwise mix with the new position.
    pub fn seek_to_second(&mut self, second: f64) {
        if self.loaded_cycles.is_empty() {
            return;
        }

        let first_ts = self.loaded_cycles[0].timestamp;
        let target_ts = first_ts + (second * 1000.0) as i64;

        self.playback_position = self
            .loaded_cycles
            .iter()
            .position(|c| c.timestamp >= target_ts)
            .unwrap_or(self.loaded_cycles.len());

        self.reset_radar();
    }

    /// Seek forward/backward by seconds
    /// التقديم/الترجيع بالثواني
    pub fn seek_by_seconds(&mut self, delta: f64) {
        let current_sec = self.get_current_playback_second();
        let new_sec = (current_sec + delta).clamp(0.0, self.playback_duration_secs.max(0.0));
        self.seek_to_second(new_sec);
    }

    /// Get current playback position in seconds
    /// الحصول على موقع التشغيل الحالي بالثواني
    pub fn get_current_playback_second(&self) -> f64 {
        let Some(first) = self.loaded_cycles.first() else {
            return 0.0;
        };
        match self.loaded_cycles.get(self.playback_position) {
            Some(current) => (current.timestamp - first.timestamp) as f64 / 1000.0,
            None => self.playback_duration_secs,
        }
    }

    /// Next scan to replay; wraps to the start at the end
    /// عملية المسح التالية للتشغيل
    pub fn advance_playback(&mut self) -> Option<ScanCycle> {
        if !self.playback_mode || !self.playback_playing {
            return None;
        }

        if self.playback_position >= self.loaded_cycles.len() {
            self.playback_position = 0;
            self.reset_radar();
            return None;
        }

        let cycle = self.loaded_cycles[self.playback_position].clone();
        self.playback_position += 1;

        Some(cycle)
    }

    /// Get playback progress as a ratio (0.0 - 1.0)
    /// الحصول على تقدم التشغيل كنسبة
    pub fn get_playback_progress(&self) -> f64 {
        if self.loaded_cycles.is_empty() {
            return 0.0;
        }
        (self.playback_position as f64 / self.loaded_cycles.len() as f64).min(1.0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Radar::new())
    }
}

fn push_bounded(history: &mut Vec<i64>, value: i64) {
    history.push(value);
    if history.len() > MAX_HISTORY {
        history.remove(0);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Shared State Type / نوع الحالة المشتركة
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe shared state type
/// نوع الحالة المشتركة الآمنة للخيوط
pub type SharedState = Arc<Mutex<AppState>>;

/// Create a new shared state instance
/// إنشاء مثيل حالة مشتركة جديد
pub fn create_shared_state(radar: Radar) -> SharedState {
    Arc::new(Mutex::new(AppState::new(radar)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rssi_radar::radar::{Bssid, RadarStatus};

    fn scan(timestamp: i64, rssi: i32) -> ScanCycle {
        ScanCycle::new(
            timestamp,
            vec![Observation::new(Bssid([1, 1, 1, 1, 1, 1]), rssi, 6, "home")],
        )
    }

    #[test]
    fn test_process_scan_updates_history() {
        let mut state = AppState::default();
        let result = state.process_scan(&scan(0, -50));

        assert_eq!(result.status, RadarStatus::Booting);
        assert_eq!(state.total_history, vec![0]);
        assert_eq!(state.slot_history[0], vec![0]);
        assert_eq!(state.cycle_count(), 1);
        assert!(state.last_result.is_some());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = AppState::default();
        for i in 0..(MAX_HISTORY as i64 + 20) {
            state.process_scan(&scan(i * 1000, -50));
        }
        assert_eq!(state.total_history.len(), MAX_HISTORY);
        assert!(state.slot_history.iter().all(|h| h.len() == MAX_HISTORY));
    }

    #[test]
    fn test_empty_scan_is_inoperable() {
        let mut state = AppState::default();
        let result = state.process_scan(&ScanCycle::new(0, Vec::new()));
        assert_eq!(result.status, RadarStatus::Inoperable);
    }

    #[test]
    fn test_playback_advance_and_wrap() {
        let mut state = AppState::default();
        state.loaded_cycles = vec![scan(0, -50), scan(1000, -51), scan(2000, -52)];
        state.start_playback();

        assert!(state.playback_mode);
        assert_eq!(state.playback_duration_secs, 2.0);

        assert_eq!(state.advance_playback().map(|c| c.timestamp), Some(0));
        assert_eq!(state.advance_playback().map(|c| c.timestamp), Some(1000));
        assert_eq!(state.advance_playback().map(|c| c.timestamp), Some(2000));
        assert_eq!(state.advance_playback(), None);
        assert_eq!(state.playback_position, 0);
    }

    #[test]
    fn test_seek_resets_radar() {
        let mut state = AppState::default();
        state.loaded_cycles = (0..10).map(|i| scan(i * 1000, -50)).collect();
        state.start_playback();
        for _ in 0..3 {
            if let Some(cycle) = state.advance_playback() {
                state.process_scan(&cycle);
            }
        }

        state.seek_to_second(5.0);

        assert_eq!(state.playback_position, 5);
        assert_eq!(state.cycle_count(), 0);
        assert!(state.total_history.is_empty());
        assert_eq!(state.get_current_playback_second(), 5.0);
    }

    #[test]
    fn test_pause_stops_advance() {
        let mut state = AppState::default();
        state.loaded_cycles = vec![scan(0, -50)];
        state.start_playback();
        state.toggle_playback();
        assert_eq!(state.advance_playback(), None);
    }
}
