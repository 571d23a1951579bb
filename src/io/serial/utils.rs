// src/io/serial/utils.rs
//
// Line settings for the serial port and their conversion to serialport crate types.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl as SpFlowControl, Parity as SpParity, StopBits};

// ============================================================================
// Constants
// ============================================================================

/// Baud rates offered as presets. Any other rate up to `MAX_BAUD_RATE` is a custom rate.
pub const STANDARD_BAUD_RATES: [u32; 8] = [115200, 57600, 38400, 19200, 9600, 4800, 2400, 1200];

pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Upper bound accepted for a custom baud rate
pub const MAX_BAUD_RATE: u32 = 4_000_000;

// ============================================================================
// Types
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

impl Parity {
    /// Single-letter form used in `8N1` style summaries
    pub fn letter(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our Parity enum to serialport crate's Parity type
pub fn to_serialport_parity(p: &Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Convert our FlowControl enum to serialport crate's FlowControl type
pub fn to_serialport_flow_control(f: &FlowControl) -> SpFlowControl {
    match f {
        FlowControl::None => SpFlowControl::None,
        FlowControl::Software => SpFlowControl::Software,
        FlowControl::Hardware => SpFlowControl::Hardware,
    }
}

/// Convert data bits count to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// Check a baud rate is a preset or an acceptable custom rate
pub fn validate_baud_rate(baud_rate: u32) -> Result<u32, String> {
    if baud_rate == 0 || baud_rate > MAX_BAUD_RATE {
        return Err(format!(
            "Invalid baud rate {}: must be between 1 and {}",
            baud_rate, MAX_BAUD_RATE
        ));
    }
    Ok(baud_rate)
}

// ============================================================================
// Tests
// ============================================================================
