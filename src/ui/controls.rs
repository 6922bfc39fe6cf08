// ═══════════════════════════════════════════════════════════════════════════════
// 📦 ui/controls.rs - Keyboard Controls Display
// ═══════════════════════════════════════════════════════════════════════════════
// Displays available keyboard shortcuts based on current mode
// ═══════════════════════════════════════════════════════════════════════════════

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::state::AppState;

/// Render controls help box
/// رسم مربع مساعدة التحكم
pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut text = if state.playback_mode {
        playback_controls()
    } else {
        live_controls()
    };
    text.extend(radar_controls());

    let block = Block::default()
        .title("⌨️ Controls")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn key(label: &'static str, color: Color, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(action),
    ])
}

/// Get controls for live mode
/// الحصول على أزرار وضع البث المباشر
fn live_controls() -> Vec<Line<'static>> {
    vec![
        key("S", Color::Green, " Start Serial"),
        key("X", Color::Yellow, " Stop Serial"),
        key("L", Color::Cyan, " Load Scan Log"),
        key("Q", Color::Red, " Quit"),
    ]
}

/// Get controls for playback mode
/// الحصول على أزرار وضع التشغيل
fn playback_controls() -> Vec<Line<'static>> {
    vec![
        key("Space", Color::Green, " Play/Pause"),
        key("←→", Color::Cyan, " ±5s"),
        key("↑↓", Color::Cyan, " ±30s"),
        key("R", Color::Yellow, " Restart"),
        key("B", Color::Magenta, " Back to Live"),
        key("Q/Esc", Color::Red, " Quit"),
    ]
}

/// Radar settings, available in both modes
/// إعدادات الرادار في كلا الوضعين
fn radar_controls() -> Vec<Line<'static>> {
    vec![
        key("T", Color::LightBlue, " Alarm"),
        key("+/-", Color::LightBlue, " Threshold"),
        key("A", Color::LightBlue, " Autoregressive"),
        key("F", Color::LightBlue, " Second-order"),
        key("C", Color::LightBlue, " Aggressive cleaning"),
        key("[ ]", Color::LightBlue, " Slots"),
        key("N", Color::LightBlue, " Reset radar"),
    ]
}
