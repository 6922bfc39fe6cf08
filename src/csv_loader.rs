// ═══════════════════════════════════════════════════════════════════════════════
// 📦 csv_loader.rs - Scan Log Loader
// ═══════════════════════════════════════════════════════════════════════════════
// This module loads scan logs written by csv_logger for playback.
// Features:
// - Rows grouped back into scan cycles by the `cycle` column
// - Empty-scan rows become empty cycles (Inoperable on replay)
// - Malformed rows are skipped with a warning
// ═══════════════════════════════════════════════════════════════════════════════

use std::path::Path;

use thiserror::Error;

use rssi_radar::radar::{Bssid, Observation};

use crate::csv_logger::ScanRow;
use crate::state::{ScanCycle, SharedState};

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Errors / الأخطاء
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum CsvLoadError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("not a scan log: missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("scan log contains no scans")]
    Empty,
}

const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "cycle", "bssid", "rssi", "channel", "ssid"];

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Loading / التحميل
// ═══════════════════════════════════════════════════════════════════════════════

/// Load a scan log from a file
/// تحميل سجل مسح من ملف
pub fn load_scan_log<P: AsRef<Path>>(path: P) -> Result<Vec<ScanCycle>, CsvLoadError> {
    let reader = csv::Reader::from_path(path.as_ref())?;
    read_scan_log(reader)
}

/// Group scan-log rows into cycles
/// تجميع صفوف السجل في دورات
pub fn read_scan_log<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<ScanCycle>, CsvLoadError> {
    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == column) {
            return Err(CsvLoadError::MissingColumn(column));
        }
    }

    let mut cycles: Vec<ScanCycle> = Vec::new();
    let mut current_cycle: Option<u64> = None;

    for (line, row) in reader.deserialize::<ScanRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(line = line + 2, error = %e, "skipping scan log row");
                continue;
            }
        };

        if current_cycle != Some(row.cycle) {
            current_cycle = Some(row.cycle);
            cycles.push(ScanCycle::new(row.timestamp, Vec::new()));
        }

        if row.bssid.is_empty() {
            continue;
        }

        let observation = match (Bssid::parse(&row.bssid), row.rssi) {
            (Ok(bssid), Some(rssi)) => {
                Observation::new(bssid, rssi, row.channel.unwrap_or(0), &row.ssid)
            }
            _ => {
                tracing::warn!(line = line + 2, bssid = %row.bssid, "skipping invalid observation");
                continue;
            }
        };

        if let Some(cycle) = cycles.last_mut() {
            cycle.observations.push(observation);
        }
    }

    if cycles.is_empty() {
        return Err(CsvLoadError::Empty);
    }

    Ok(cycles)
}

/// Load a scan log directly into AppState and start playback
/// تحميل السجل مباشرة إلى AppState وبدء التشغيل
pub fn load_into_state<P: AsRef<Path>>(path: P, state: &SharedState) -> Result<usize, String> {
    let cycles = load_scan_log(path).map_err(|e| e.to_string())?;
    let count = cycles.len();

    let mut state_guard = state
        .lock()
        .map_err(|e| format!("Failed to lock state: {}", e))?;

    state_guard.loaded_cycles = cycles;
    state_guard.start_playback();

    state_guard.status_message = format!(
        "✅ Loaded {} scans ({:.1}s) - Space: Play/Pause, ←→: Seek",
        count, state_guard.playback_duration_secs
    );

    Ok(count)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Helper Functions / دوال مساعدة
// ═══════════════════════════════════════════════════════════════════════════════

/// Open file dialog and load a scan log (uses rfd crate)
/// فتح نافذة اختيار الملف وتحميل السجل (يستخدم مكتبة rfd)
pub fn pick_and_load_csv(state: &SharedState) -> Result<usize, String> {
    let file = rfd::FileDialog::new()
        .add_filter("CSV Files", &["csv"])
        .add_filter("All Files", &["*"])
        .set_title("Select Scan Log")
        .pick_file();

    match file {
        Some(path) => load_into_state(&path, state),
        None => Err("No file selected".to_string()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════
