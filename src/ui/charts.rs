// ═══════════════════════════════════════════════════════════════════════════════
// 📦 ui/charts.rs - Chart Components
// ═══════════════════════════════════════════════════════════════════════════════
// Contains: Per-slot variance chart, Cumulative variance chart with threshold
// ═══════════════════════════════════════════════════════════════════════════════

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use crate::state::{AppState, MAX_HISTORY};

/// Line colors for slots 0..MAX_SLOTS / ألوان خطوط الخانات
const SLOT_COLORS: [Color; 8] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::LightBlue,
    Color::LightRed,
    Color::White,
    Color::LightGreen,
];

/// Smallest Y range so a quiet room still shows a scale
const MIN_Y_RANGE: f64 = 32.0;

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Chart Panel / لوحة الرسم البياني
// ═══════════════════════════════════════════════════════════════════════════════

/// Render the right chart panel
/// رسم لوحة الرسم البياني اليمنى
pub fn render_chart_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_slot_chart(frame, chunks[0], state);
    render_total_chart(frame, chunks[1], state);
}

fn to_points(history: &[i64]) -> Vec<(f64, f64)> {
    history
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v as f64))
        .collect()
}

/// Upper Y bound: data peak, never below the threshold or MIN_Y_RANGE
fn y_upper(peak: i64, threshold: i64) -> f64 {
    (peak.max(threshold) as f64 * 1.2).max(MIN_Y_RANGE)
}

fn y_labels(upper: f64) -> Vec<Span<'static>> {
    vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", upper / 2.0)),
        Span::raw(format!("{:.0}", upper)),
    ]
}

fn x_axis() -> Axis<'static> {
    Axis::default()
        .title("Cycle")
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, MAX_HISTORY as f64])
        .labels(vec![
            Span::raw("0"),
            Span::raw(format!("{}", MAX_HISTORY / 2)),
            Span::raw(format!("{}", MAX_HISTORY)),
        ])
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Per-Slot Variance / التباين لكل خانة
// ═══════════════════════════════════════════════════════════════════════════════

fn render_slot_chart(frame: &mut Frame, area: Rect, state: &AppState) {
    let slot_count = state.radar.registry().slot_count();
    let threshold = state.radar.channel_config().variance_threshold;

    let series: Vec<(String, Vec<(f64, f64)>)> = state
        .slot_history
        .iter()
        .take(slot_count)
        .enumerate()
        .map(|(i, history)| (format!("slot {i}"), to_points(history)))
        .collect();

    let peak = state
        .slot_history
        .iter()
        .take(slot_count)
        .flat_map(|h| h.iter().copied())
        .max()
        .unwrap_or(0);
    let upper = y_upper(peak, threshold);

    let threshold_line = [(0.0, threshold as f64), (MAX_HISTORY as f64, threshold as f64)];

    let mut datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.as_str())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SLOT_COLORS[i % SLOT_COLORS.len()]))
                .data(points)
        })
        .collect();

    if state.radar.channel_config().alarm_enabled {
        datasets.push(
            Dataset::default()
                .name("threshold")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Red))
                .data(&threshold_line),
        );
    }

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title("📈 Variance per Transmitter")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        )
        .x_axis(x_axis())
        .y_axis(
            Axis::default()
                .title("dBm²")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, upper])
                .labels(y_labels(upper)),
        );

    frame.render_widget(chart, area);
}

// ═══════════════════════════════════════════════════════════════════════════════
// 🔹 Cumulative Variance / التباين الكلي
// ═══════════════════════════════════════════════════════════════════════════════

fn render_total_chart(frame: &mut Frame, area: Rect, state: &AppState) {
    let points = to_points(&state.total_history);
    let peak = state.total_history.iter().copied().max().unwrap_or(0);
    let upper = y_upper(peak, 0);

    let datasets = vec![Dataset::default()
        .name("total")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Red))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title("🔴 Cumulative Variance")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .x_axis(x_axis())
        .y_axis(
            Axis::default()
                .title("dBm²")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, upper])
                .labels(y_labels(upper)),
        );

    frame.render_widget(chart, area);
}
