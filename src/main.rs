// ═══════════════════════════════════════════════════════════════════════════════
// 📦 main.rs - Application Entry Point
// ═══════════════════════════════════════════════════════════════════════════════
// Usage: rssi_radar [config.toml]   (default: ./rssi_radar.toml, optional)
// ═══════════════════════════════════════════════════════════════════════════════

mod app;
mod csv_loader;
mod csv_logger;
mod menu;
mod parser;
mod serial_reader;
mod state;
mod ui;

use std::io;
use std::path::PathBuf;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use rssi_radar::config::{Config, DEFAULT_CONFIG_FILE};
use rssi_radar::{logging, Radar};

use crate::app::App;
use crate::menu::{show_menu, MenuChoice};
use crate::state::create_shared_state;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::load_or_default(&config_path)?;

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Warning: {}", e);
    }
    tracing::info!(config = %config_path.display(), "rssi_radar starting");

    loop {
        // Small delay to ensure terminal is ready
        std::thread::sleep(std::time::Duration::from_millis(100));

        let choice = match show_menu(&config.serial) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };

        match choice {
            MenuChoice::SelectPort { port, baud } => {
                config.serial.port = Some(port);
                config.serial.baud_rate = baud;
                if let Err(e) = run_radar_viewer(&config) {
                    eprintln!("Error: {}", e);
                }
            }
            MenuChoice::ViewRadar => {
                if let Err(e) = run_radar_viewer(&config) {
                    eprintln!("Error: {}", e);
                }
            }
            MenuChoice::Quit => {
                println!("Goodbye!");
                break;
            }
        }
    }

    tracing::info!("rssi_radar exiting");
    Ok(())
}

fn run_radar_viewer(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let radar = Radar::from_config(&config.radar)?;
    let state = create_shared_state(radar);
    {
        let mut guard = state.lock().map_err(|e| e.to_string())?;
        guard.port_name = config.serial.port.clone().unwrap_or_default();
        guard.baud_rate = config.serial.baud_rate;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(state.clone(), config.serial.clone());
    let result = run_app_loop(&mut terminal, &mut app, &state);

    // Cleanup - important to do in correct order!
    // تنظيف - مهم بالترتيب الصحيح!
    drop(app);
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Clear any pending events
    // تنظيف الأحداث المعلقة
    while crossterm::event::poll(std::time::Duration::from_millis(10))? {
        let _ = crossterm::event::read();
    }

    result.map_err(|e| e.into())
}

fn run_app_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    state: &state::SharedState,
) -> Result<(), String> {
    loop {
        app.tick_playback()?;
        terminal
            .draw(|frame| {
                ui::render(frame, state);
            })
            .map_err(|e| format!("Draw error: {}", e))?;
        if app.handle_events()? {
            break;
        }
        {
            let state_guard = state.lock().map_err(|e| e.to_string())?;
            if state_guard.should_quit {
                break;
            }
        }
    }
    Ok(())
}
