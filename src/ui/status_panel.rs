// ═══════════════════════════════════════════════════════════════════════════════
// 📦 ui/status_panel.rs - Status Panel Components
// ═══════════════════════════════════════════════════════════════════════════════
// Contains: Receiver status, Radar summary, Slot table, Playback bar
// ═══════════════════════════════════════════════════════════════════════════════

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame,
};

use rssi_radar::radar::{RadarStatus, SlotState};

use super::controls;
use crate::state::AppState;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Main Status Panel / لوحة الحالة الرئيسية
// ═══════════════════════════════════════════════════════════════════════════════

/// Render the left status panel
/// رسم لوحة الحالة اليسرى
pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let slot_rows = state.radar.registry().slot_count() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),             // Receiver status / حالة المستقبل
            Constraint::Length(7),             // Radar summary / ملخص الرادار
            Constraint::Length(slot_rows + 3), // Slot table / جدول الخانات
            Constraint::Length(3),             // Playback bar / شريط التشغيل
            Constraint::Min(6),                // Controls / التحكم
        ])
        .split(area);

    render_receiver_status(frame, chunks[0], state);
    render_radar_summary(frame, chunks[1], state);
    render_slot_table(frame, chunks[2], state);
    render_playback_bar(frame, chunks[3], state);
    controls::render(frame, chunks[4], state);
}

/// Color used for a radar status everywhere in the UI
pub fn status_color(status: &RadarStatus) -> Color {
    match status {
        RadarStatus::Detection(_) => Color::Red,
        RadarStatus::NoDetection => Color::Green,
        RadarStatus::Level(_) => Color::Yellow,
        RadarStatus::Booting => Color::Cyan,
        RadarStatus::Inoperable | RadarStatus::Uninitialized => Color::DarkGray,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Receiver Status / حالة المستقبل
// ═══════════════════════════════════════════════════════════════════════════════

fn render_receiver_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let (status_text, status_color) = if state.receiver_active {
        ("● ACTIVE", Color::Green)
    } else {
        ("○ STOPPED", Color::Red)
    };

    let port = if state.port_name.is_empty() {
        "auto".to_string()
    } else {
        format!("{} @ {}", state.port_name, state.baud_rate)
    };

    let text = vec![
        Line::from(vec![
            Span::raw("Status: "),
            Span::styled(
                status_text,
                Style::default().fg(status_color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  Port: "),
            Span::styled(port, Style::default().fg(Color::Cyan)),
        ]),
        Line::from(Span::raw(&state.status_message)),
    ];

    let block = Block::default()
        .title("📡 Receiver")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Radar Summary / ملخص الرادار
// ═══════════════════════════════════════════════════════════════════════════════

fn render_radar_summary(frame: &mut Frame, area: Rect, state: &AppState) {
    let config = state.radar.channel_config();
    let registry = state.radar.registry();

    let (status, total) = match &state.last_result {
        Some(result) => (result.status, result.total_variance),
        None => (RadarStatus::Booting, 0),
    };

    let flag = |on: bool| if on { "on" } else { "off" };

    let text = vec![
        Line::from(vec![
            Span::raw("Motion: "),
            Span::styled(
                status.to_string(),
                Style::default().fg(status_color(&status)).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("Total variance: "),
            Span::styled(total.to_string(), Style::default().fg(Color::Yellow)),
            Span::raw("  Detections: "),
            Span::styled(state.detection_count.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(state.cycle_count().to_string(), Style::default().fg(Color::Yellow)),
            Span::raw("  Slots: "),
            Span::styled(
                format!("{}/{}", registry.valid_count(), registry.slot_count()),
                Style::default().fg(Color::Magenta),
            ),
        ]),
        Line::from(format!(
            "Alarm {} thr {} | min {} dBm",
            flag(config.alarm_enabled),
            config.variance_threshold,
            config.minimum_rssi
        )),
        Line::from(format!(
            "AR {} | 2nd {} /{} | clean {}",
            flag(config.autoregressive_enabled),
            flag(config.second_order_enabled),
            config.second_order_attenuation,
            flag(registry.aggressive_cleaning())
        )),
    ];

    let block = Block::default()
        .title("🔍 Radar")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    frame.render_widget(Paragraph::new(text).block(block), area);
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Slot Table / جدول الخانات
// ═══════════════════════════════════════════════════════════════════════════════

fn render_slot_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let reports = state.last_result.as_ref().map(|r| r.slots.as_slice()).unwrap_or(&[]);

    let rows: Vec<Row> = state
        .radar
        .registry()
        .slots()
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let report = reports.get(index);

            let state_color = match slot.state() {
                SlotState::Valid => Color::Green,
                SlotState::Invalid => Color::Red,
                SlotState::Init | SlotState::Free => Color::DarkGray,
            };

            let (bssid, ssid) = if slot.state() == SlotState::Valid {
                (slot.identity().to_string(), slot.display_name().to_string())
            } else {
                ("-".to_string(), String::new())
            };

            let rssi = report
                .and_then(|r| r.rssi)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());

            let (value, value_color) = match report.and_then(|r| r.status) {
                Some(status) => (
                    status
                        .value()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| status.label().to_string()),
                    status_color(&status),
                ),
                None => ("-".to_string(), Color::DarkGray),
            };

            let alarm = if report.and_then(|r| r.alarm).is_some() { "🔴" } else { "" };

            Row::new(vec![
                Cell::from(index.to_string()),
                Cell::from(slot.state().label()).style(Style::default().fg(state_color)),
                Cell::from(bssid),
                Cell::from(ssid),
                Cell::from(rssi),
                Cell::from(value).style(Style::default().fg(value_color)),
                Cell::from(alarm),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Length(8),
        Constraint::Length(17),
        Constraint::Min(6),
        Constraint::Length(5),
        Constraint::Length(9),
        Constraint::Length(2),
    ];

    let header = Row::new(vec!["#", "State", "BSSID", "SSID", "RSSI", "Variance", ""])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title("📶 Transmitters")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    frame.render_widget(table, area);
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Playback Bar / شريط التشغيل
// ═══════════════════════════════════════════════════════════════════════════════

fn render_playback_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.playback_mode {
        let play_status = if state.playback_playing { "▶️" } else { "⏸️" };
        let label = format!(
            "{} {:.1}s / {:.1}s",
            play_status,
            state.get_current_playback_second(),
            state.playback_duration_secs
        );

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title("🎬 Playback")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
            .ratio(state.get_playback_progress())
            .label(label);

        frame.render_widget(gauge, area);
    } else {
        let text = vec![Line::from(Span::styled(
            "No file loaded",
            Style::default().fg(Color::DarkGray),
        ))];

        let block = Block::default()
            .title("🎬 Playback")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        frame.render_widget(Paragraph::new(text).block(block), area);
    }
}
