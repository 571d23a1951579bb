// src/cli.rs
//
// Command-line options. Connection flags override the stored settings and are
// persisted, so the next launch starts from the same config.

use clap::Parser;
use std::path::PathBuf;

use crate::io::serial::{FlowControl, Parity};
use crate::settings::AppSettings;

#[derive(Parser, Debug)]
#[command(name = "counterscope", version, about = "Monitor a counter reported by a serial device")]
pub struct Cli {
    /// Serial port to open (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate: a standard rate or any custom rate up to 4000000
    #[arg(short, long)]
    pub baud: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub data_bits: Option<u8>,

    #[arg(long, value_enum)]
    pub parity: Option<Parity>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub stop_bits: Option<u8>,

    #[arg(long, value_enum)]
    pub flow_control: Option<FlowControl>,

    /// Prefix each log entry with its capture time
    #[arg(long, overrides_with = "no_timestamps")]
    pub timestamps: bool,

    #[arg(long, overrides_with = "timestamps")]
    pub no_timestamps: bool,

    /// Clear the counter every time a connection opens
    #[arg(long)]
    pub reset_on_connect: bool,

    /// Write diagnostic logs to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

impl Cli {
    /// Fold the flags into `settings`. Returns true when anything changed.
    pub fn apply_overrides(&self, settings: &mut AppSettings) -> bool {
        let before = settings.clone();
        let conn = &mut settings.connection;

        if let Some(port) = &self.port {
            conn.port_name = port.clone();
        }
        if let Some(baud) = self.baud {
            conn.baud_rate = baud;
        }
        if let Some(bits) = self.data_bits {
            conn.data_bits = bits;
        }
        if let Some(parity) = self.parity {
            conn.parity = parity;
        }
        if let Some(bits) = self.stop_bits {
            conn.stop_bits = bits;
        }
        if let Some(flow) = self.flow_control {
            conn.flow_control = flow;
        }
        if self.timestamps {
            conn.timestamp_enabled = true;
        } else if self.no_timestamps {
            conn.timestamp_enabled = false;
        }
        if self.reset_on_connect {
            settings.reset_counter_on_connect = true;
        }
        if let Some(dir) = &self.log_dir {
            settings.log_dir = dir.to_string_lossy().to_string();
            settings.file_logging = true;
        }

        *settings != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("counterscope").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_change_nothing() {
        let mut settings = AppSettings::default();
        assert!(!parse(&[]).apply_overrides(&mut settings));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_connection_flags() {
        let cli = parse(&[
            "--port", "/dev/ttyACM0", "--baud", "9600", "--data-bits", "7",
            "--parity", "even", "--stop-bits", "2", "--flow-control", "hardware", "--timestamps",
        ]);
        let mut settings = AppSettings::default();
        assert!(cli.apply_overrides(&mut settings));

        let conn = &settings.connection;
        assert_eq!(conn.port_name, "/dev/ttyACM0");
        assert_eq!(conn.baud_rate, 9600);
        assert_eq!(conn.data_bits, 7);
        assert_eq!(conn.parity, Parity::Even);
        assert_eq!(conn.stop_bits, 2);
        assert_eq!(conn.flow_control, FlowControl::Hardware);
        assert!(conn.timestamp_enabled);
    }

    #[test]
    fn test_last_timestamp_flag_wins() {
        let mut settings = AppSettings::default();
        parse(&["--timestamps", "--no-timestamps"]).apply_overrides(&mut settings);
        assert!(!settings.connection.timestamp_enabled);
    }

    #[test]
    fn test_log_dir_enables_file_logging() {
        let mut settings = AppSettings::default();
        parse(&["--log-dir", "/tmp/cs-logs"]).apply_overrides(&mut settings);
        assert!(settings.file_logging);
        assert_eq!(settings.log_dir, "/tmp/cs-logs");
    }

    #[test]
    fn test_out_of_range_data_bits_rejected() {
        let result = Cli::try_parse_from(["counterscope", "--data-bits", "9"]);
        assert!(result.is_err());
    }
}
