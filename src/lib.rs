#[macro_use]
mod logging;

pub mod cli;
pub mod counter;
pub mod interpreter;
pub mod io;
pub mod log_sink;
pub mod session;
pub mod settings;
pub mod tui;

#[cfg(test)]
pub(crate) mod test_support;

use clap::Parser;
use std::path::Path;

use crate::cli::Cli;
use crate::io::serial::list_serial_ports;
use crate::io::serial::utils::STANDARD_BAUD_RATES;
use crate::settings::{default_settings_path, load_settings, save_settings};

// ============================================================================
// Entry Point
// ============================================================================

fn print_ports() -> Result<(), String> {
    let ports = list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in &ports {
        println!("{}", port.describe());
    }

    let rates: Vec<String> = STANDARD_BAUD_RATES.iter().map(|r| r.to_string()).collect();
    println!("Standard baud rates: {}", rates.join(", "));
    Ok(())
}

pub fn run() -> Result<(), String> {
    let cli = Cli::parse();

    if cli.list_ports {
        return print_ports();
    }

    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path)?;
    if cli.apply_overrides(&mut settings) {
        save_settings(&settings_path, &settings)?;
    }
    settings.connection.validate()?;

    if settings.file_logging {
        logging::init_file_logging(Path::new(&settings.log_dir))?;
    }
    tlog!(
        "[startup] counterscope {} using {}",
        env!("CARGO_PKG_VERSION"),
        settings_path.display()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;
    let result = runtime.block_on(tui::run(settings, settings_path));

    logging::stop_file_logging();
    result
}
