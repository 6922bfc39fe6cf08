// ═══════════════════════════════════════════════════════════════════════════════
// 📦 serial_reader.rs - Serial Port Scan Reader
// ═══════════════════════════════════════════════════════════════════════════════
// This module handles reading Wi-Fi scan reports from ESP32 via serial port.
// Features:
// - Runs in background thread
// - Detects report blocks by "scan:" ... "end"
// - Runs one radar cycle per report under the state lock
// - Logs raw scans and variance output to CSV
// ═══════════════════════════════════════════════════════════════════════════════

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use serialport::{available_ports, SerialPortType};

use crate::csv_logger::{ScanLogger, VarianceLogger};
use crate::parser::ScanParser;
use crate::state::SharedState;

/// Automatically chooses the first available USB serial port.
pub fn auto_select_port() -> Option<String> {
    let ports = available_ports().ok()?;

    ports
        .into_iter()
        .find(|p| matches!(p.port_type, SerialPortType::UsbPort(_)))
        .map(|p| p.port_name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Serial Reader Configuration / إعدادات قارئ التسلسل
// ═══════════════════════════════════════════════════════════════════════════════

/// Default serial port name / اسم المنفذ التسلسلي الافتراضي
/// Used as a fallback if auto-detection fails.
pub const DEFAULT_PORT: &str = "COM3";

/// Read timeout in milliseconds / مهلة القراءة بالميلي ثانية
pub const READ_TIMEOUT_MS: u64 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Serial Reader Structure / هيكل قارئ التسلسل
// ═══════════════════════════════════════════════════════════════════════════════

/// Serial reader for scan reports from ESP32
/// قارئ التسلسل لتقارير المسح من ESP32
pub struct SerialReader {
    /// Port name (e.g., "COM3") / اسم المنفذ (مثل "COM3")
    port_name: String,

    /// Baud rate / معدل البود
    baud_rate: u32,

    /// Shared application state / حالة التطبيق المشتركة
    state: SharedState,

    /// Flag to stop the reader thread / علامة لإيقاف خيط القارئ
    stop_flag: Arc<AtomicBool>,

    /// Handle to the reader thread / مقبض خيط القارئ
    thread_handle: Option<JoinHandle<()>>,
}

impl SerialReader {
    /// Create a new serial reader.
    ///
    /// An empty `port_name` means auto-detect on start.
    pub fn new(state: SharedState, port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            state,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start the serial reader thread
    /// بدء خيط قارئ التسلسل
    pub fn start(&mut self) -> Result<(), String> {
        if self.thread_handle.is_some() {
            return Err("Serial reader already running".to_string());
        }

        self.stop_flag.store(false, Ordering::SeqCst);

        if self.port_name.is_empty() {
            self.port_name = auto_select_port().unwrap_or_else(|| DEFAULT_PORT.to_string());
        }

        let port_name = self.port_name.clone();
        let baud_rate = self.baud_rate;
        let state = Arc::clone(&self.state);
        let stop_flag = Arc::clone(&self.stop_flag);

        {
            let mut guard = state.lock().map_err(|e| e.to_string())?;
            guard.port_name = port_name.clone();
            guard.status_message = format!("🔄 Connecting to {}...", port_name);
        }
        tracing::info!(port = %port_name, baud_rate, "starting serial reader");

        let handle = thread::spawn(move || {
            run_serial_reader(&port_name, baud_rate, &state, &stop_flag);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop the serial reader thread
    /// إيقاف خيط قارئ التسلسل
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::info!(port = %self.port_name, "serial reader stopped");
        }

        if let Ok(mut state_guard) = self.state.lock() {
            state_guard.receiver_active = false;
            state_guard.status_message = "⏹️ Serial reader stopped".to_string();
        }
    }
}

impl Drop for SerialReader {
    fn drop(&mut self) {
        self.stop();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Serial Reader Thread Function / دالة خيط قارئ التسلسل
// ═══════════════════════════════════════════════════════════════════════════════

/// Loggers owned by the reader thread for one session
struct SessionLog {
    scans: Option<ScanLogger>,
    variances: Option<VarianceLogger>,
    /// Scans written so far; numbers scan-log rows independently of radar resets
    scans_logged: u64,
}

impl SessionLog {
    fn open() -> Self {
        let scans = ScanLogger::new_with_timestamp()
            .map_err(|e| tracing::warn!(error = %e, "scan log disabled"))
            .ok();
        let variances = VarianceLogger::new_with_timestamp()
            .map_err(|e| tracing::warn!(error = %e, "variance log disabled"))
            .ok();
        Self {
            scans,
            variances,
            scans_logged: 0,
        }
    }

    fn flush(&mut self) {
        if let Some(ref mut logger) = self.scans {
            let _ = logger.flush();
        }
        if let Some(ref mut logger) = self.variances {
            let _ = logger.flush();
        }
    }
}

/// Main function that runs in the serial reader thread
/// الدالة الرئيسية التي تعمل في خيط قارئ التسلسل
fn run_serial_reader(
    port_name: &str,
    baud_rate: u32,
    state: &SharedState,
    stop_flag: &Arc<AtomicBool>,
) {
    let port_result = serialport::new(port_name, baud_rate)
        .timeout(Duration::from_millis(READ_TIMEOUT_MS))
        .open();

    let mut port = match port_result {
        Ok(p) => {
            if let Ok(mut state_guard) = state.lock() {
                state_guard.receiver_active = true;
                state_guard.status_message = format!("✅ Connected to {}", port_name);
            }
            p
        }
        Err(e) => {
            tracing::error!(port = port_name, error = %e, "failed to open serial port");
            if let Ok(mut state_guard) = state.lock() {
                state_guard.receiver_active = false;
                state_guard.status_message = format!("❌ Failed to open {}: {}", port_name, e);
            }
            return;
        }
    };

    let parser = ScanParser::new();
    let mut log = SessionLog::open();

    let mut text_buffer = String::new();
    let mut read_buffer = [0u8; 1024];

    while !stop_flag.load(Ordering::SeqCst) {
        match port.read(&mut read_buffer) {
            Ok(bytes_read) if bytes_read > 0 => {
                let text = String::from_utf8_lossy(&read_buffer[..bytes_read]);
                text_buffer.push_str(&text);

                process_buffer(&mut text_buffer, &parser, state, &mut log);
            }
            Ok(_) => {}
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                // Timeout is normal, continue / المهلة طبيعية، متابعة
            }
            Err(e) => {
                tracing::error!(port = port_name, error = %e, "serial read failed");
                if let Ok(mut state_guard) = state.lock() {
                    state_guard.status_message = format!("⚠️ Read error: {}", e);
                }
                break;
            }
        }
    }

    log.flush();

    if let Ok(mut state_guard) = state.lock() {
        state_guard.receiver_active = false;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Buffer Processing / معالجة المخزن المؤقت
// ═══════════════════════════════════════════════════════════════════════════════

/// Run a radar cycle for every complete report in the buffer
/// تشغيل دورة رادار لكل تقرير مكتمل في المخزن
fn process_buffer(
    buffer: &mut String,
    parser: &ScanParser,
    state: &SharedState,
    log: &mut SessionLog,
) {
    let timestamp = Utc::now().timestamp_millis();

    for scan in parser.drain_blocks(buffer, timestamp) {
        // one cycle per lock / دورة واحدة لكل قفل
        let result = {
            let Ok(mut state_guard) = state.lock() else {
                return;
            };
            // live data is ignored while a file is replayed
            if state_guard.playback_mode {
                continue;
            }
            let result = state_guard.process_scan(&scan);
            state_guard.status_message = format!(
                "📥 Scan #{}: {} APs, {}",
                result.cycle,
                scan.observations.len(),
                result.status
            );
            result
        };

        if let Some(ref mut logger) = log.scans {
            log.scans_logged += 1;
            if let Err(e) = logger.log_scan(log.scans_logged, &scan) {
                tracing::warn!(error = %e, "scan log write failed");
            }
        }
        if let Some(ref mut logger) = log.variances {
            if let Err(e) = logger.log_result(scan.timestamp, &result) {
                tracing::warn!(error = %e, "variance log write failed");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_loader::load_scan_log;
    use crate::state::AppState;
    use rssi_radar::radar::RadarStatus;
    use std::sync::Mutex;

    #[test]
    fn test_serial_reader_creation() {
        let state = Arc::new(Mutex::new(AppState::default()));
        let _reader = SerialReader::new(state, "COM7".to_string(), 115_200);
    }

    #[test]
    fn test_process_buffer_runs_cycles() {
        let state = Arc::new(Mutex::new(AppState::default()));
        let parser = ScanParser::new();
        let mut log = SessionLog {
            scans: None,
            variances: None,
            scans_logged: 0,
        };
        let mut buffer = String::from(
            "scan:1\nap:aa:bb:cc:dd:ee:01,-50,1,lab\nend\nscan:0\nend\n",
        );

        process_buffer(&mut buffer, &parser, &state, &mut log);

        let guard = state.lock().unwrap();
        assert_eq!(guard.cycle_count(), 2);
        assert_eq!(
            guard.last_result.as_ref().map(|r| r.status),
            Some(RadarStatus::Inoperable)
        );
        assert_eq!(guard.radar.registry().valid_count(), 1);
    }

    #[test]
    fn test_scan_log_survives_radar_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        let state = Arc::new(Mutex::new(AppState::default()));
        let parser = ScanParser::new();
        let mut log = SessionLog {
            scans: Some(ScanLogger::new(path.clone()).unwrap()),
            variances: None,
            scans_logged: 0,
        };

        let mut buffer = String::from("scan:1\nap:aa:bb:cc:dd:ee:01,-50,1,lab\nend\n");
        process_buffer(&mut buffer, &parser, &state, &mut log);
        state.lock().unwrap().reset_radar();
        let mut buffer = String::from("scan:1\nap:aa:bb:cc:dd:ee:02,-60,6,lab\nend\n");
        process_buffer(&mut buffer, &parser, &state, &mut log);
        log.flush();

        // both scans were radar cycle 1
        let cycles = load_scan_log(&path).unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].observations.len(), 1);
        assert_eq!(cycles[1].observations[0].rssi, -60);
    }

    #[test]
    fn test_live_scans_ignored_during_playback() {
        let state = Arc::new(Mutex::new(AppState::default()));
        state.lock().unwrap().playback_mode = true;
        let mut log = SessionLog {
            scans: None,
            variances: None,
            scans_logged: 0,
        };
        let mut buffer = String::from("scan:0\nend\n");

        process_buffer(&mut buffer, &ScanParser::new(), &state, &mut log);

        assert_eq!(state.lock().unwrap().cycle_count(), 0);
    }
}
