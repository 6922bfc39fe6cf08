// ═══════════════════════════════════════════════════════════════════════════════
// 📦 csv_logger.rs - CSV Data Loggers
// ═══════════════════════════════════════════════════════════════════════════════
// This module handles logging scan data and radar output to CSV files.
// Features:
// - Scan log: one row per access point per scan, replayable by csv_loader
// - Variance log: per-slot variance + cumulative total per cycle (graph data)
// - Empty scans keep their row so replay reproduces Inoperable cycles
// - Flushes on drop
// ═══════════════════════════════════════════════════════════════════════════════

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rssi_radar::radar::{CycleResult, MAX_SLOTS};

use crate::state::ScanCycle;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Errors / الأخطاء
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum CsvLogError {
    #[error("failed to create CSV file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write CSV row: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush CSV file: {0}")]
    Flush(#[from] std::io::Error),
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Scan Log Row / صف سجل المسح
// ═══════════════════════════════════════════════════════════════════════════════

/// One row of the scan log; shared with the loader
/// صف واحد من سجل المسح
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub timestamp: i64,
    pub cycle: u64,
    /// Empty for a scan that saw nothing
    pub bssid: String,
    pub rssi: Option<i32>,
    pub channel: Option<u8>,
    pub ssid: String,
}

/// Build a file name like `scan_log_20240101_120000.csv`
fn timestamped_name(prefix: &str) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{prefix}_{timestamp}.csv"))
}

fn create_writer(path: &Path) -> Result<csv::Writer<File>, CsvLogError> {
    csv::Writer::from_path(path).map_err(|source| CsvLogError::Create {
        path: path.to_path_buf(),
        source,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Scan Logger / مسجل المسح
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw observations, one row per access point
/// الملاحظات الخام، صف لكل نقطة وصول
pub struct ScanLogger {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl ScanLogger {
    /// Create a scan logger at `path` (truncates)
    /// إنشاء مسجل مسح جديد
    pub fn new(path: PathBuf) -> Result<Self, CsvLogError> {
        let writer = create_writer(&path)?;
        Ok(Self { writer, path })
    }

    /// Create a scan logger with an auto-generated filename
    /// إنشاء مسجل باسم ملف تلقائي
    pub fn new_with_timestamp() -> Result<Self, CsvLogError> {
        Self::new(timestamped_name("scan_log"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every observation of one scan
    /// كتابة جميع ملاحظات عملية مسح واحدة
    pub fn log_scan(&mut self, cycle: u64, scan: &ScanCycle) -> Result<(), CsvLogError> {
        if scan.observations.is_empty() {
            self.writer.serialize(ScanRow {
                timestamp: scan.timestamp,
                cycle,
                bssid: String::new(),
                rssi: None,
                channel: None,
                ssid: String::new(),
            })?;
            return Ok(());
        }

        for obs in &scan.observations {
            self.writer.serialize(ScanRow {
                timestamp: scan.timestamp,
                cycle,
                bssid: obs.bssid.to_string(),
                rssi: Some(obs.rssi),
                channel: Some(obs.channel),
                ssid: obs.ssid.clone(),
            })?;
        }
        Ok(())
    }

    /// Flush all buffered data to disk
    /// تفريغ جميع البيانات المخزنة إلى القرص
    pub fn flush(&mut self) -> Result<(), CsvLogError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for ScanLogger {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Variance Logger / مسجل التباين
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-cycle radar output: `timestamp,cycle,status,total,slot0..slot7`
/// مخرجات الرادار لكل دورة
///
/// There is a column for every slot the radar can have, so the slot count
/// may change during a session; inactive slots are left empty.
pub struct VarianceLogger {
    writer: csv::Writer<File>,
}

impl VarianceLogger {
    /// Create a variance logger with `MAX_SLOTS` slot columns
    pub fn new(path: PathBuf) -> Result<Self, CsvLogError> {
        let mut writer = create_writer(&path)?;

        let mut header = vec![
            "timestamp".to_string(),
            "cycle".to_string(),
            "status".to_string(),
            "total".to_string(),
        ];
        header.extend((0..MAX_SLOTS).map(|i| format!("slot{i}")));
        writer.write_record(&header)?;

        Ok(Self { writer })
    }

    pub fn new_with_timestamp() -> Result<Self, CsvLogError> {
        Self::new(timestamped_name("variance_log"))
    }

    /// Write one cycle; unprocessed slots stay empty
    /// كتابة دورة واحدة
    pub fn log_result(&mut self, timestamp: i64, result: &CycleResult) -> Result<(), CsvLogError> {
        let mut row = vec![
            timestamp.to_string(),
            result.cycle.to_string(),
            result.status.label().to_string(),
            result.total_variance.to_string(),
        ];

        row.extend((0..MAX_SLOTS).map(|i| {
            result
                .slots
                .get(i)
                .and_then(|slot| slot.variance())
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));

        self.writer.write_record(&row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CsvLogError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for VarianceLogger {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════
