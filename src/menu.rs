// ═══════════════════════════════════════════════════════════════════════════════
// 📦 menu.rs - Main Menu (Simple)
// ═══════════════════════════════════════════════════════════════════════════════
// قائمة بسيطة: اختيار المنفذ أو عرض الرادار
// ═══════════════════════════════════════════════════════════════════════════════

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};

use rssi_radar::config::SerialConfig;

/// Menu choice
#[derive(Debug, Clone, PartialEq)]
pub enum MenuChoice {
    SelectPort { port: String, baud: u32 },
    ViewRadar,
    Quit,
}

/// Show main menu and get choice
pub fn show_menu(serial: &SerialConfig) -> Result<MenuChoice, String> {
    let _ = disable_raw_mode();

    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).map_err(|e| e.to_string())?;

    println!();
    println!("  ╔═══════════════════════════════════════════════════╗");
    println!("  ║                                                   ║");
    println!("  ║       📡 RSSI Radar - Wi-Fi Motion Detector       ║");
    println!("  ║                                                   ║");
    println!("  ╠═══════════════════════════════════════════════════╣");
    println!("  ║                                                   ║");
    println!("  ║   [1] 🔌 Select Port - Choose ESP32 serial port   ║");
    println!("  ║                                                   ║");
    println!("  ║   [2] 📊 View Radar  - Live / playback view       ║");
    println!("  ║                                                   ║");
    println!("  ║   [Q] 🚪 Quit                                     ║");
    println!("  ║                                                   ║");
    println!("  ╚═══════════════════════════════════════════════════╝");
    println!();

    println!(
        "  Current port: {} @ {} baud",
        serial.port.as_deref().unwrap_or("auto"),
        serial.baud_rate
    );
    print_available_ports();

    println!();
    println!("  Press 1, 2, or Q:");
    stdout.flush().map_err(|e| e.to_string())?;

    enable_raw_mode().map_err(|e| e.to_string())?;

    // Clear any pending events
    while event::poll(Duration::from_millis(100)).unwrap_or(false) {
        let _ = event::read();
    }

    let choice = loop {
        if event::poll(Duration::from_millis(100)).map_err(|e| e.to_string())? {
            if let Ok(Event::Key(key)) = event::read() {
                // Only handle Press events (not Release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('1') => break 1,
                    KeyCode::Char('2') => break 2,
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => break 0,
                    _ => continue,
                }
            }
        }
    };

    disable_raw_mode().map_err(|e| e.to_string())?;

    match choice {
        1 => {
            let (port, baud) = get_port_settings(serial.baud_rate)?;
            Ok(MenuChoice::SelectPort { port, baud })
        }
        2 => Ok(MenuChoice::ViewRadar),
        _ => Ok(MenuChoice::Quit),
    }
}

/// Get port settings from user
fn get_port_settings(default_baud: u32) -> Result<(String, u32), String> {
    let mut stdout = io::stdout();

    println!();
    println!("  ─────────────────────────────────────────────────────");
    println!("  🔌 Serial Port Configuration");
    println!("  ─────────────────────────────────────────────────────");

    print_available_ports();

    println!();
    print!("  Enter port name (e.g., COM3, /dev/ttyUSB0): ");
    stdout.flush().map_err(|e| e.to_string())?;

    let mut port = String::new();
    io::stdin().read_line(&mut port).map_err(|e| e.to_string())?;
    let port = port.trim().to_string();

    if port.is_empty() {
        return Err("Port name cannot be empty".to_string());
    }

    println!();
    println!("  Common baud rates: 9600, 115200, 460800, 921600");
    print!("  Enter baud rate [{}]: ", default_baud);
    stdout.flush().map_err(|e| e.to_string())?;

    let mut baud_str = String::new();
    io::stdin().read_line(&mut baud_str).map_err(|e| e.to_string())?;

    let baud = parse_baud(&baud_str, default_baud)?;

    println!();
    println!("  ✅ Using {} @ {} baud", port, baud);
    println!();

    Ok((port, baud))
}

/// Empty input keeps the default
fn parse_baud(input: &str, default_baud: u32) -> Result<u32, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default_baud);
    }
    match input.parse::<u32>() {
        Ok(0) | Err(_) => Err(format!("Invalid baud rate: {}", input)),
        Ok(baud) => Ok(baud),
    }
}

/// Print available serial ports
fn print_available_ports() {
    print!("  📋 Available ports: ");

    match serialport::available_ports() {
        Ok(ports) if !ports.is_empty() => {
            let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();
            println!("{}", port_names.join(", "));
        }
        _ => {
            println!("(none detected)");
        }
    }
}
