// src/settings.rs
//
// Persistent application settings and the connection config the session opens with.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::io::serial::utils::{validate_baud_rate, DEFAULT_BAUD_RATE};
use crate::io::serial::{FlowControl, Parity};

// ============================================================================
// Connection Config
// ============================================================================

/// Everything needed to open the device. Two configs are equal iff every
/// field matches; equality decides whether a re-apply reconnects.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub flow_control: FlowControl,
    #[serde(default)]
    pub timestamp_enabled: bool,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::None,
            stop_bits: default_stop_bits(),
            flow_control: FlowControl::None,
            timestamp_enabled: false,
        }
    }
}

impl ConnectionConfig {
    /// Reject line settings the serial driver cannot honour
    pub fn validate(&self) -> Result<(), String> {
        validate_baud_rate(self.baud_rate)?;
        if !(5..=8).contains(&self.data_bits) {
            return Err(format!("Invalid data bits {}: must be 5-8", self.data_bits));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(format!("Invalid stop bits {}: must be 1 or 2", self.stop_bits));
        }
        Ok(())
    }

    /// `/dev/ttyUSB0 @ 115200 8N1`
    pub fn summary(&self) -> String {
        format!(
            "{} @ {} {}{}{}",
            if self.port_name.is_empty() { "<no port>" } else { &self.port_name },
            self.baud_rate,
            self.data_bits,
            self.parity.letter(),
            self.stop_bits
        )
    }
}

// ============================================================================
// App Settings
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Directory for diagnostic log files
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default)]
    pub file_logging: bool,
    /// Start each connection from an unset counter
    #[serde(default)]
    pub reset_counter_on_connect: bool,
}

fn default_log_dir() -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("counterscope")
        .join("logs")
        .to_string_lossy()
        .to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            log_dir: default_log_dir(),
            file_logging: false,
            reset_counter_on_connect: false,
        }
    }
}

/// Default location of the settings file
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("counterscope")
        .join("settings.json")
}

/// Load settings from `path`; on first run write and return the defaults.
pub fn load_settings(path: &Path) -> Result<AppSettings, String> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
    } else {
        let settings = AppSettings::default();
        save_settings(path, &settings)?;
        tlog!("[settings] Created default settings at {}", path.display());
        Ok(settings)
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create settings dir: {}", e))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
}

// ============================================================================
// Settings Store
// ============================================================================

/// Holds the config last applied by the user and remembers whether that
/// apply changed anything.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    current: ConnectionConfig,
    changed_on_last_apply: bool,
}

impl SettingsStore {
    pub fn new(initial: ConnectionConfig) -> Self {
        Self {
            current: initial,
            changed_on_last_apply: false,
        }
    }

    pub fn current_config(&self) -> &ConnectionConfig {
        &self.current
    }

    /// Replace the current config. Returns true when any field differs.
    pub fn apply(&mut self, config: ConnectionConfig) -> bool {
        self.changed_on_last_apply = config != self.current;
        self.current = config;
        tlog!(
            "[settings] Applied: port '{}', baud {} (changed: {})",
            self.current.port_name,
            self.current.baud_rate,
            self.changed_on_last_apply
        );
        self.changed_on_last_apply
    }

    pub fn changed_on_last_apply(&self) -> bool {
        self.changed_on_last_apply
    }
}

/// Whether a "config applied" event should (re)open the connection:
/// always when closed, otherwise only when the config changed.
pub fn needs_reopen(is_open: bool, changed: bool) -> bool {
    !is_open || changed
}
