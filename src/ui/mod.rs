// ═══════════════════════════════════════════════════════════════════════════════
// 📦 ui/mod.rs - Terminal User Interface Module
// ═══════════════════════════════════════════════════════════════════════════════
// This module implements the TUI using Ratatui.
// Features:
// - Two-column layout (Status | Charts)
// - Slot table with alarm flags
// - Per-slot and cumulative variance charts
// - Keyboard controls display
// ═══════════════════════════════════════════════════════════════════════════════

mod charts;
mod controls;
mod status_panel;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::state::SharedState;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Main Render Function / دالة الرسم الرئيسية
// ═══════════════════════════════════════════════════════════════════════════════

/// Render the entire UI
/// رسم واجهة المستخدم بالكامل
pub fn render(frame: &mut Frame, state: &SharedState) {
    let state_guard = match state.lock() {
        Ok(guard) => guard,
        Err(_) => return,
    };

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40), // Left panel - Status / اللوحة اليسرى - الحالة
            Constraint::Percentage(60), // Right panel - Charts / اللوحة اليمنى - الرسوم
        ])
        .split(frame.area());

    status_panel::render(frame, main_chunks[0], &state_guard);
    charts::render_chart_panel(frame, main_chunks[1], &state_guard);
}
