// ═══════════════════════════════════════════════════════════════════════════════
// 📦 parser.rs - Scan Report Parser
// ═══════════════════════════════════════════════════════════════════════════════
// This module parses Wi-Fi scan reports printed by the ESP32 firmware.
//
//   scan:<count>
//   ap:<aa:bb:cc:dd:ee:ff>,<rssi>,<channel>,<ssid>
//   ...
//   end
//
// Complete blocks are cut out of the serial text buffer; malformed ap: lines
// are skipped.
// ═══════════════════════════════════════════════════════════════════════════════

use regex::Regex;

use rssi_radar::radar::{Bssid, Observation};

use crate::state::ScanCycle;

/// Drop buffered text beyond this size when no block completes
/// حجم المخزن الأقصى قبل التخلص من البيانات القديمة
const MAX_BUFFER_LEN: usize = 16_384;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Scan Parser / محلل المسح
// ═══════════════════════════════════════════════════════════════════════════════

/// Parser for scan report blocks
/// محلل كتل تقارير المسح
pub struct ScanParser {
    /// Whole `scan:` … `end` block / كتلة كاملة
    block_regex: Regex,

    /// Header line inside a block body / سطر رأس داخل الكتلة
    header_regex: Regex,

    /// One access point line / سطر نقطة وصول واحدة
    ap_regex: Regex,
}

impl ScanParser {
    /// Create a new scan parser instance
    /// إنشاء مثيل محلل مسح جديد
    pub fn new() -> Self {
        // the patterns are constant, compiling them cannot fail
        let block_regex = Regex::new(r"(?ms)^scan:(\d+)\r?$(.*?)^end\r?$")
            .expect("block pattern is valid");
        let header_regex =
            Regex::new(r"(?m)^scan:(\d+)\r?$").expect("header pattern is valid");
        let ap_regex = Regex::new(
            r"^ap:([0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5}),(-?\d+),(\d+),(.*)$",
        )
        .expect("ap pattern is valid");

        Self {
            block_regex,
            header_regex,
            ap_regex,
        }
    }

    /// Parse one `ap:` line
    /// تحليل سطر نقطة وصول واحد
    pub fn parse_ap_line(&self, line: &str) -> Option<Observation> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = self.ap_regex.captures(line)?;

        let bssid = Bssid::parse(&caps[1]).ok()?;
        let rssi: i32 = caps[2].parse().ok()?;
        let channel: u8 = caps[3].parse().ok()?;

        Some(Observation::new(bssid, rssi, channel, &caps[4]))
    }

    /// Parse the body of a block (the lines between header and `end`)
    /// تحليل محتوى الكتلة
    pub fn parse_body(&self, body: &str) -> Vec<Observation> {
        body.lines()
            .map(str::trim_start)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let parsed = self.parse_ap_line(line);
                if parsed.is_none() {
                    tracing::debug!(line, "skipping malformed scan line");
                }
                parsed
            })
            .collect()
    }

    /// Cut every complete block out of `buffer`.
    ///
    /// Text up to the end of the last complete block is consumed; a partial
    /// block stays for the next read.
    pub fn drain_blocks(&self, buffer: &mut String, timestamp: i64) -> Vec<ScanCycle> {
        let mut cycles = Vec::new();
        let mut consumed = 0;

        for caps in self.block_regex.captures_iter(buffer) {
            let mut declared: usize = caps[1].parse().unwrap_or(0);
            let mut body = caps.get(2).map_or("", |m| m.as_str());

            // A header inside the body means the earlier report was cut off
            // before its `end`; only the last report is complete.
            if let Some(last) = self.header_regex.captures_iter(body).last() {
                tracing::warn!(declared, "discarding truncated scan report");
                declared = last[1].parse().unwrap_or(0);
                let start = last.get(0).map_or(body.len(), |m| m.end());
                body = &body[start..];
            }

            let observations = self.parse_body(body);

            if observations.len() != declared {
                tracing::debug!(
                    declared,
                    parsed = observations.len(),
                    "scan count mismatch"
                );
            }

            cycles.push(ScanCycle::new(timestamp, observations));
            if let Some(whole) = caps.get(0) {
                consumed = whole.end();
            }
        }

        if consumed > 0 {
            buffer.replace_range(..consumed, "");
        }

        // Prevent buffer from growing too large / منع نمو المخزن بشكل كبير جداً
        if buffer.len() > MAX_BUFFER_LEN {
            match buffer.rfind("scan:") {
                Some(last) if last > 0 => buffer.replace_range(..last, ""),
                Some(_) => buffer.clear(),
                None => buffer.clear(),
            }
        }

        cycles
    }
}

impl Default for ScanParser {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Unit Tests / اختبارات الوحدة
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ap_line() {
        let parser = ScanParser::new();
        let obs = parser
            .parse_ap_line("ap:AA:BB:CC:00:11:22,-67,11,Home Net, 2.4G\r")
            .unwrap();

        assert_eq!(obs.bssid.to_string(), "aa:bb:cc:00:11:22");
        assert_eq!(obs.rssi, -67);
        assert_eq!(obs.channel, 11);
        assert_eq!(obs.ssid, "Home Net, 2.4G");
    }

    #[test]
    fn test_parse_ap_line_rejects_garbage() {
        let parser = ScanParser::new();
        assert!(parser.parse_ap_line("ap:AA:BB:CC,-67,11,x").is_none());
        assert!(parser.parse_ap_line("ap:AA:BB:CC:00:11:22,strong,11,x").is_none());
        assert!(parser.parse_ap_line("ap:AA:BB:CC:00:11:22,-67,999,x").is_none());
        assert!(parser.parse_ap_line("I (123) wifi: connected").is_none());
    }

    #[test]
    fn test_drain_complete_block() {
        let parser = ScanParser::new();
        let mut buffer = String::from(
            "boot noise\r\nscan:2\r\nap:aa:bb:cc:dd:ee:01,-50,1,one\r\nap:aa:bb:cc:dd:ee:02,-60,6,\r\nend\r\nscan:1\r\nap:",
        );

        let cycles = parser.drain_blocks(&mut buffer, 42);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].timestamp, 42);
        assert_eq!(cycles[0].observations.len(), 2);
        assert_eq!(cycles[0].observations[1].ssid, "");
        // partial block kept
        assert!(buffer.contains("scan:1"));
        assert!(!buffer.contains("boot noise"));
    }

    #[test]
    fn test_drain_partial_then_complete() {
        let parser = ScanParser::new();
        let mut buffer = String::from("scan:1\nap:aa:bb:cc:dd:ee:01,-50,1,one\n");
        assert!(parser.drain_blocks(&mut buffer, 0).is_empty());

        buffer.push_str("end\n");
        let cycles = parser.drain_blocks(&mut buffer, 0);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].observations[0].rssi, -50);
    }

    #[test]
    fn test_empty_scan_block() {
        let parser = ScanParser::new();
        let mut buffer = String::from("scan:0\nend\n");
        let cycles = parser.drain_blocks(&mut buffer, 0);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].observations.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let parser = ScanParser::new();
        let mut buffer = String::from(
            "scan:3\nap:aa:bb:cc:dd:ee:01,-50,1,ok\nap:broken\nap:aa:bb:cc:dd:ee:03,-70,3,ok\nend\n",
        );
        let cycles = parser.drain_blocks(&mut buffer, 0);
        assert_eq!(cycles[0].observations.len(), 2);
    }

    #[test]
    fn test_truncated_report_discarded() {
        let parser = ScanParser::new();
        let mut buffer = String::from(
            "scan:3\nap:aa:bb:cc:dd:ee:01,-50,1,a\nap:aa:bb:cc:dd:ee:02,-55,1,b\n\
             scan:1\nap:aa:bb:cc:dd:ee:03,-60,6,c\nend\n",
        );

        let cycles = parser.drain_blocks(&mut buffer, 0);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].observations.len(), 1);
        assert_eq!(cycles[0].observations[0].bssid.to_string(), "aa:bb:cc:dd:ee:03");
        assert!(buffer.trim().is_empty());
    }

    #[test]
    fn test_oversized_buffer_trimmed() {
        let parser = ScanParser::new();
        let mut buffer = "x".repeat(MAX_BUFFER_LEN + 10);
        buffer.push_str("scan:1\n");
        parser.drain_blocks(&mut buffer, 0);
        assert_eq!(buffer, "scan:1\n");
    }
}
