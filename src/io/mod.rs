// src/io/mod.rs
//
// Byte-stream transport abstraction. The session depends only on `ByteSource`;
// the serial port is one implementation of it.

pub mod serial;
pub mod types;

use thiserror::Error;

use crate::settings::ConnectionConfig;

pub use types::{SourceEvent, SourceEventKind, SourceNotifier};

// ============================================================================
// Errors
// ============================================================================

/// Connection-level failures. Invalid line content is not an error; see
/// `interpreter::ParsedLine::Invalid`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The config names no port; the transport was not touched
    #[error("No port name specified")]
    NoPortName,
    /// Device unavailable, permission denied or bad configuration
    #[error("Failed to open {port}: {reason}")]
    Open { port: String, reason: String },
    /// I/O failure while the connection was open
    #[error("{0}")]
    Fault(String),
}

// ============================================================================
// Byte Source
// ============================================================================

/// A byte stream the session can open, drain and close.
///
/// While open, the source posts `DataAvailable` through the notifier whenever
/// new bytes arrive and `Fault` if the transport fails. It never calls back
/// into the session directly.
pub trait ByteSource: Send {
    /// Acquire the transport. Must fail fast rather than wait for a device.
    fn open(&mut self, config: &ConnectionConfig, notifier: SourceNotifier)
        -> Result<(), TransportError>;

    /// Release the transport. No-op when already closed.
    fn close(&mut self);

    /// Take every byte received so far (possibly none)
    fn read_available(&mut self) -> Vec<u8>;

    fn is_open(&self) -> bool;

    /// Device type identifier for diagnostics
    fn device_type(&self) -> &'static str {
        "unknown"
    }
}
