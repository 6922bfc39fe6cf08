// ═══════════════════════════════════════════════════════════════════════════════
// 📦 app.rs - Application Logic
// ═══════════════════════════════════════════════════════════════════════════════
// This module contains the main application logic and event handling.
// Features:
// - Event loop management
// - Keyboard input handling (serial, playback, live radar settings)
// - Integration of all components
// ═══════════════════════════════════════════════════════════════════════════════

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use rssi_radar::config::SerialConfig;
use rssi_radar::radar::ChannelConfig;

use crate::csv_loader::pick_and_load_csv;
use crate::serial_reader::SerialReader;
use crate::state::{AppState, SharedState};

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Application Configuration / إعدادات التطبيق
// ═══════════════════════════════════════════════════════════════════════════════

/// Tick rate for the event loop in milliseconds
/// معدل التحديث لحلقة الأحداث بالميلي ثانية
const TICK_RATE_MS: u64 = 50;

/// Threshold change per +/- key press (dBm²)
const THRESHOLD_STEP: i64 = 4;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Application Structure / هيكل التطبيق
// ═══════════════════════════════════════════════════════════════════════════════

/// Main application structure
/// هيكل التطبيق الرئيسي
pub struct App {
    /// Shared application state / حالة التطبيق المشتركة
    state: SharedState,

    /// Serial port settings / إعدادات المنفذ التسلسلي
    serial: SerialConfig,

    /// Serial reader instance / مثيل قارئ التسلسل
    serial_reader: Option<SerialReader>,
}

impl App {
    /// Create a new application instance
    /// إنشاء مثيل تطبيق جديد
    pub fn new(state: SharedState, serial: SerialConfig) -> Self {
        Self {
            state,
            serial,
            serial_reader: None,
        }
    }

    /// Handle keyboard and other events
    /// معالجة لوحة المفاتيح والأحداث الأخرى
    ///
    /// Returns true if should quit / يرجع true إذا يجب الخروج
    pub fn handle_events(&mut self) -> Result<bool, String> {
        if event::poll(Duration::from_millis(TICK_RATE_MS))
            .map_err(|e| format!("Event poll error: {}", e))?
        {
            let read = event::read().map_err(|e| format!("Event read error: {}", e))?;
            if let Event::Key(key) = read {
                if key.kind == KeyEventKind::Press {
                    return self.handle_key(key.code);
                }
            }
        }

        Ok(false)
    }

    /// Replay the next loaded scan if playback is running
    /// تشغيل عملية المسح التالية من الملف المحمل
    pub fn tick_playback(&mut self) -> Result<(), String> {
        let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
        if let Some(scan) = state_guard.advance_playback() {
            let result = state_guard.process_scan(&scan);
            state_guard.status_message = format!(
                "Playing: {:.1}s / {:.1}s - {}",
                state_guard.get_current_playback_second(),
                state_guard.playback_duration_secs,
                result.status
            );
        }
        Ok(())
    }

    /// Handle a single key press
    /// معالجة ضغطة مفتاح واحدة
    fn handle_key(&mut self, key: KeyCode) -> Result<bool, String> {
        match key {
            // Q / Esc - Quit / الخروج
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                return Ok(true);
            }

            // S - Start Serial / بدء التسلسل
            KeyCode::Char('s') | KeyCode::Char('S') => {
                {
                    let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                    state_guard.stop_playback();
                }
                self.start_serial()?;
            }

            // X - Stop Serial / إيقاف التسلسل
            KeyCode::Char('x') | KeyCode::Char('X') => {
                self.stop_serial();
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                state_guard.stop_playback();
            }

            // L - Load scan log / تحميل سجل المسح
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.load_csv()?;
            }

            KeyCode::Char(' ') => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                state_guard.toggle_playback();
                let status = if state_guard.playback_playing { "▶️ Playing" } else { "⏸️ Paused" };
                state_guard.status_message = format!(
                    "{} - {:.1}s / {:.1}s",
                    status,
                    state_guard.get_current_playback_second(),
                    state_guard.playback_duration_secs
                );
            }

            KeyCode::Left => self.seek(-5.0, "⏪")?,
            KeyCode::Right => self.seek(5.0, "⏩")?,
            KeyCode::Up => self.seek(-30.0, "⏪⏪")?,
            KeyCode::Down => self.seek(30.0, "⏩⏩")?,

            KeyCode::Home => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                if state_guard.playback_mode {
                    state_guard.seek_to_second(0.0);
                    state_guard.status_message = "⏮️ Start".to_string();
                }
            }

            KeyCode::End => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                if state_guard.playback_mode {
                    let duration = state_guard.playback_duration_secs;
                    state_guard.seek_to_second(duration);
                    state_guard.status_message = "⏭️ End".to_string();
                }
            }

            // R - Restart playback / إعادة التشغيل
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                if state_guard.playback_mode {
                    state_guard.seek_to_second(0.0);
                    state_guard.playback_playing = true;
                    state_guard.status_message = "🔄 Restarted".to_string();
                }
            }

            // B - Back to Live Mode / العودة للبث المباشر
            KeyCode::Char('b') | KeyCode::Char('B') => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                if state_guard.playback_mode {
                    state_guard.stop_playback();
                    state_guard.loaded_cycles.clear();
                    state_guard.reset_radar();
                    state_guard.status_message = "📡 Live Mode - Press S to connect".to_string();
                }
            }

            // N - Forget all transmitters / نسيان جميع أجهزة الإرسال
            KeyCode::Char('n') | KeyCode::Char('N') => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                state_guard.reset_radar();
                state_guard.status_message = "🧹 Radar reset".to_string();
            }

            // Live radar settings / إعدادات الرادار المباشرة
            KeyCode::Char('t') | KeyCode::Char('T') => {
                self.update_channels("Alarm", |c| c.alarm_enabled = !c.alarm_enabled)?;
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.update_channels("Autoregressive", |c| {
                    c.autoregressive_enabled = !c.autoregressive_enabled
                })?;
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.update_channels("Second-order filter", |c| {
                    c.second_order_enabled = !c.second_order_enabled
                })?;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.update_channels("Threshold", |c| c.variance_threshold += THRESHOLD_STEP)?;
            }
            KeyCode::Char('-') => {
                self.update_channels("Threshold", |c| {
                    c.variance_threshold = (c.variance_threshold - THRESHOLD_STEP).max(0)
                })?;
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
                let enabled = !state_guard.radar.registry().aggressive_cleaning();
                state_guard.radar.set_aggressive_cleaning(enabled);
                state_guard.status_message =
                    format!("Aggressive cleaning {}", if enabled { "ON" } else { "OFF" });
            }
            KeyCode::Char(']') => self.change_slot_count(1)?,
            KeyCode::Char('[') => self.change_slot_count(-1)?,

            _ => {}
        }

        Ok(false)
    }

    fn seek(&mut self, delta: f64, icon: &str) -> Result<(), String> {
        let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
        if state_guard.playback_mode {
            state_guard.seek_by_seconds(delta);
            state_guard.status_message = format!(
                "{} Seek: {:.1}s / {:.1}s",
                icon,
                state_guard.get_current_playback_second(),
                state_guard.playback_duration_secs
            );
        }
        Ok(())
    }

    /// Apply a change to every channel's configuration
    /// تطبيق تغيير على إعدادات جميع القنوات
    fn update_channels(
        &mut self,
        what: &str,
        change: impl FnOnce(&mut ChannelConfig),
    ) -> Result<(), String> {
        let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
        apply_channel_change(&mut state_guard, what, change);
        Ok(())
    }

    fn change_slot_count(&mut self, delta: isize) -> Result<(), String> {
        let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
        let current = state_guard.radar.registry().slot_count();
        let requested = current.saturating_add_signed(delta);
        let released = state_guard.radar.set_slot_count(requested).len();
        let applied = state_guard.radar.registry().slot_count();
        tracing::info!(slot_count = applied, released, "slot count changed");
        state_guard.status_message = if released > 0 {
            format!("Slots: {} ({} transmitter(s) released)", applied, released)
        } else {
            format!("Slots: {}", applied)
        };
        Ok(())
    }

    /// Start the serial reader
    /// بدء قارئ التسلسل
    fn start_serial(&mut self) -> Result<(), String> {
        self.stop_serial();

        let port = self.serial.port.clone().unwrap_or_default();
        let mut reader = SerialReader::new(self.state.clone(), port, self.serial.baud_rate);

        if let Err(e) = reader.start() {
            let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
            state_guard.status_message = format!("❌ {}", e);
            return Err(e);
        }

        self.serial_reader = Some(reader);
        Ok(())
    }

    /// Stop the serial reader
    /// إيقاف قارئ التسلسل
    fn stop_serial(&mut self) {
        if let Some(ref mut reader) = self.serial_reader {
            reader.stop();
        }
        self.serial_reader = None;
    }

    /// Load a scan log
    /// تحميل سجل مسح
    fn load_csv(&mut self) -> Result<(), String> {
        self.stop_serial();

        {
            let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
            state_guard.status_message = "📂 Opening file dialog...".to_string();
        }

        if let Err(e) = pick_and_load_csv(&self.state) {
            tracing::warn!(error = %e, "scan log not loaded");
            let mut state_guard = self.state.lock().map_err(|e| e.to_string())?;
            state_guard.status_message = format!("❌ {}", e);
        }

        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop_serial();
    }
}

/// Change the shared channel configuration and report it in the status line
fn apply_channel_change(
    state: &mut AppState,
    what: &str,
    change: impl FnOnce(&mut ChannelConfig),
) {
    let mut config = state.radar.channel_config();
    change(&mut config);

    match state.radar.configure_channels(config) {
        Ok(()) => {
            let applied = state.radar.channel_config();
            tracing::info!(?applied, "channel configuration changed");
            state.status_message = format!(
                "{} → alarm {} | thr {} | AR {} | 2nd {}",
                what,
                on_off(applied.alarm_enabled),
                applied.variance_threshold,
                on_off(applied.autoregressive_enabled),
                on_off(applied.second_order_enabled)
            );
        }
        Err(e) => state.status_message = format!("❌ {}", e),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════
